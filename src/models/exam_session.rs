use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One exam attempt for a (candidate, batch) pair. Once `is_submitted` is
/// set the row is terminal and immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamSession {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_submitted: bool,
}
