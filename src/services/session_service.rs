use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::services::result_service::unanswered_ids;
use crate::store::{ExamStore, SessionStart};
use crate::utils::clock::Clock;

pub const WITHIN_TIME: &str = "within time";
pub const EXCEEDED_TIME: &str = "exceeded time";

/// Reconciled outcome of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitSummary {
    pub exam_duration_used_minutes: f64,
    pub duration_status: String,
    pub unanswered_question_ids: Vec<i32>,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn ExamStore>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(store: Arc<dyn ExamStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Starts the candidate's single exam attempt, or resumes the open one.
    /// `NotAssignedToBatch` without a batch binding; `AlreadySubmitted` once
    /// the attempt for this batch is terminal.
    pub async fn start(&self, candidate_id: Uuid) -> Result<SessionStart> {
        let candidate = self.store.candidate_by_id(candidate_id).await?;
        let batch_id = candidate.batch_id.ok_or(Error::NotAssignedToBatch)?;
        let start = self
            .store
            .open_session(candidate_id, batch_id, self.clock.now())
            .await?;
        if start.resumed() {
            tracing::info!(candidate = %candidate.user_id, "resuming exam session");
        } else {
            tracing::info!(candidate = %candidate.user_id, "exam session started");
        }
        Ok(start)
    }

    /// Submits the candidate's open session (terminal, irreversible) and
    /// reports elapsed time against the batch duration plus the unanswered
    /// set. Exceeding the duration is reported, never enforced.
    pub async fn submit(&self, candidate_id: Uuid) -> Result<SubmitSummary> {
        let submitted = self.store.close_session(candidate_id, self.clock.now()).await?;
        let batch = self.store.batch_by_id(submitted.session.batch_id).await?;

        let ended_at = submitted
            .session
            .ended_at
            .ok_or_else(|| Error::Internal("submitted session has no end time".to_string()))?;
        let elapsed = elapsed_minutes(submitted.session.started_at, ended_at);
        let summary = SubmitSummary {
            exam_duration_used_minutes: round2(elapsed),
            duration_status: duration_status(elapsed, batch.exam_duration_minutes).to_string(),
            unanswered_question_ids: unanswered_ids(
                &submitted.assigned_question_ids,
                &submitted.saved_question_ids,
            ),
        };
        tracing::info!(
            candidate_id = %candidate_id,
            minutes = summary.exam_duration_used_minutes,
            status = %summary.duration_status,
            "exam submitted"
        );
        Ok(summary)
    }
}

pub fn elapsed_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> f64 {
    (ended_at - started_at).num_milliseconds() as f64 / 60_000.0
}

pub fn duration_status(elapsed_minutes: f64, allowed_minutes: i32) -> &'static str {
    if elapsed_minutes <= allowed_minutes as f64 {
        WITHIN_TIME
    } else {
        EXCEEDED_TIME
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
