use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::Answer;
use crate::store::ExamStore;

pub const STATUS_SUBMITTED: &str = "Submitted";
pub const STATUS_NOT_SUBMITTED: &str = "Not Submitted";

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub score: usize,
    pub attempted: usize,
    pub unanswered_question_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateResult {
    pub candidate_name: String,
    pub user_id: String,
    pub score: usize,
    pub attempted: usize,
    pub exam_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResults {
    pub batch_title: String,
    pub results: Vec<CandidateResult>,
}

#[derive(Clone)]
pub struct ResultService {
    store: Arc<dyn ExamStore>,
}

impl ResultService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Compares the candidate's answer ledger against their fixed paper.
    pub async fn score(&self, candidate_id: Uuid) -> Result<CandidateScore> {
        let assignments = self.store.assignments_for_candidate(candidate_id).await?;
        let assigned_ids: Vec<i32> = assignments.iter().map(|a| a.question_id).collect();
        let questions = self.store.questions_by_ids(&assigned_ids).await?;
        let key: HashMap<i32, String> = questions.into_iter().map(|q| (q.id, q.answer)).collect();
        let answers = self.store.answers_for_candidate(candidate_id).await?;
        Ok(reconcile(&assigned_ids, &key, &answers))
    }

    pub async fn batch_results(&self, batch_id: Uuid) -> Result<BatchResults> {
        let batch = self.store.batch_by_id(batch_id).await?;
        let candidates = self.store.candidates_in_batch(batch.id).await?;

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let summary = self.score(candidate.id).await?;
            let submitted = self
                .store
                .submitted_session_exists(candidate.id, batch.id)
                .await?;
            results.push(CandidateResult {
                candidate_name: candidate.name,
                user_id: candidate.user_id,
                score: summary.score,
                attempted: summary.attempted,
                exam_status: if submitted {
                    STATUS_SUBMITTED.to_string()
                } else {
                    STATUS_NOT_SUBMITTED.to_string()
                },
            });
        }
        Ok(BatchResults {
            batch_title: batch.title,
            results,
        })
    }
}

/// score = saved answers matching the correct label, attempted = non-empty
/// selections, unanswered = assigned minus saved (pure set difference).
pub fn reconcile(
    assigned_ids: &[i32],
    answer_key: &HashMap<i32, String>,
    answers: &[Answer],
) -> CandidateScore {
    let score = answers
        .iter()
        .filter(|a| {
            !a.selected_option.is_empty()
                && answer_key
                    .get(&a.question_id)
                    .is_some_and(|correct| *correct == a.selected_option)
        })
        .count();
    let attempted = answers
        .iter()
        .filter(|a| !a.selected_option.is_empty())
        .count();

    let saved: Vec<i32> = answers
        .iter()
        .filter(|a| a.is_saved)
        .map(|a| a.question_id)
        .collect();
    CandidateScore {
        score,
        attempted,
        unanswered_question_ids: unanswered_ids(assigned_ids, &saved),
    }
}

pub fn unanswered_ids(assigned_ids: &[i32], saved_ids: &[i32]) -> Vec<i32> {
    let saved: HashSet<i32> = saved_ids.iter().copied().collect();
    let mut unanswered: Vec<i32> = assigned_ids
        .iter()
        .copied()
        .filter(|id| !saved.contains(id))
        .collect();
    unanswered.sort_unstable();
    unanswered
}
