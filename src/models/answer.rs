use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// At most one row per (candidate, question); saves overwrite in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub question_id: i32,
    pub selected_option: String,
    pub is_saved: bool,
    pub answered_at: DateTime<Utc>,
}
