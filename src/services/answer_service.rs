use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::store::ExamStore;
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AnswerService {
    store: Arc<dyn ExamStore>,
    clock: Arc<dyn Clock>,
}

impl AnswerService {
    pub fn new(store: Arc<dyn ExamStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Upserts the candidate's choice for an assigned question. Rejects
    /// questions outside the candidate's fixed paper and any write after the
    /// exam has been submitted.
    pub async fn save_answer(
        &self,
        candidate_id: Uuid,
        question_id: i32,
        selected_option: &str,
    ) -> Result<Answer> {
        let candidate = self.store.candidate_by_id(candidate_id).await?;

        if !self.store.assignment_exists(candidate_id, question_id).await? {
            return Err(Error::NotAssigned);
        }

        if let Some(batch_id) = candidate.batch_id {
            if self
                .store
                .submitted_session_exists(candidate_id, batch_id)
                .await?
            {
                return Err(Error::AlreadySubmitted);
            }
        }

        self.store
            .upsert_answer(candidate_id, question_id, selected_option, self.clock.now())
            .await
    }

    pub async fn answers(&self, candidate_id: Uuid) -> Result<Vec<Answer>> {
        self.store.answers_for_candidate(candidate_id).await
    }
}
