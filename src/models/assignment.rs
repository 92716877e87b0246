use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One (candidate, question) binding. Append-only: the set of assignments
/// for a candidate is their fixed exam paper and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub question_id: i32,
    pub assigned_at: DateTime<Utc>,
}
