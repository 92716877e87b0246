use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::assignment::Assignment;
use crate::models::question::{Difficulty, Question};
use crate::store::ExamStore;
use crate::utils::clock::Clock;

/// Per-tier target counts for one candidate's paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl Distribution {
    /// Default policy: 40% Easy, 30% Medium, remainder Hard. Rounding loss
    /// is absorbed by the Hard tier.
    pub fn default_for(total: usize) -> Self {
        let easy = total * 40 / 100;
        let medium = total * 30 / 100;
        Self {
            easy,
            medium,
            hard: total - easy - medium,
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }

    fn tiers(&self) -> [(Difficulty, usize); 3] {
        [
            (Difficulty::Easy, self.easy),
            (Difficulty::Medium, self.medium),
            (Difficulty::Hard, self.hard),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationFailure {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAllocationReport {
    pub allocated: usize,
    pub failures: Vec<AllocationFailure>,
}

#[derive(Clone)]
pub struct AllocationService {
    store: Arc<dyn ExamStore>,
    clock: Arc<dyn Clock>,
}

impl AllocationService {
    pub fn new(store: Arc<dyn ExamStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Builds one candidate's fixed paper: draws each tier's count from the
    /// eligible pool, then persists all assignments atomically. All-or-
    /// nothing per candidate; a candidate with any existing assignment is
    /// rejected with `AlreadyAssigned`.
    pub async fn allocate(
        &self,
        candidate_id: Uuid,
        batch_id: Uuid,
        distribution: Distribution,
    ) -> Result<Vec<Assignment>> {
        let mut pools = Vec::with_capacity(3);
        for (difficulty, count) in distribution.tiers() {
            let pool = self.store.eligible_questions(batch_id, difficulty).await?;
            pools.push((difficulty, count, pool));
        }

        // Explicit in-memory sampling: shuffle the eligible tier pool and
        // take the prefix. The RNG stays out of await scope.
        let selected = {
            let mut rng = rand::thread_rng();
            let mut ids = Vec::with_capacity(distribution.total());
            for (difficulty, count, pool) in pools {
                let available = pool.len();
                match sample_questions(pool, count, &mut rng) {
                    Some(picked) => ids.extend(picked.into_iter().map(|q| q.id)),
                    None => {
                        return Err(Error::InsufficientPool {
                            difficulty,
                            requested: count,
                            available,
                        })
                    }
                }
            }
            ids
        };

        let assignments = self
            .store
            .create_assignments(candidate_id, batch_id, &selected, self.clock.now())
            .await?;
        tracing::info!(
            candidate_id = %candidate_id,
            questions = assignments.len(),
            "allocated exam paper"
        );
        Ok(assignments)
    }

    /// Allocates every candidate in the batch, continuing past per-candidate
    /// failures and collecting them into the report.
    pub async fn allocate_batch(
        &self,
        batch_id: Uuid,
        total_questions: usize,
    ) -> Result<BatchAllocationReport> {
        let batch = self.store.batch_by_id(batch_id).await?;
        let candidates = self.store.candidates_in_batch(batch.id).await?;
        if candidates.is_empty() {
            return Err(Error::BadRequest("No candidates in this batch".to_string()));
        }

        let distribution = Distribution::default_for(total_questions);
        let mut allocated = 0;
        let mut failures = Vec::new();
        for candidate in candidates {
            match self.allocate(candidate.id, batch.id, distribution).await {
                Ok(_) => allocated += 1,
                Err(err @ (Error::InsufficientPool { .. } | Error::AlreadyAssigned)) => {
                    tracing::warn!(
                        candidate = %candidate.user_id,
                        error = %err,
                        "skipping candidate during batch allocation"
                    );
                    failures.push(AllocationFailure {
                        candidate_id: candidate.id,
                        candidate_name: candidate.name,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(BatchAllocationReport {
            allocated,
            failures,
        })
    }
}

fn sample_questions<R: Rng>(
    mut pool: Vec<Question>,
    count: usize,
    rng: &mut R,
) -> Option<Vec<Question>> {
    if pool.len() < count {
        return None;
    }
    pool.shuffle(rng);
    pool.truncate(count);
    Some(pool)
}
