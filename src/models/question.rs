use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "difficulty")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// A bank question. Immutable after creation except for `batch_id`, which is
/// set at most once when the first allocation claims it into a batch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i32,
    pub question: String,
    /// Labeled options, e.g. {"A": "...", "B": "...", "C": "...", "D": "..."}.
    pub options: JsonValue,
    /// Correct option label.
    pub answer: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub batch_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub options: JsonValue,
    pub answer: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub created_by: Option<Uuid>,
}
