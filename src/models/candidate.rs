use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    /// Login identifier generated at provisioning time, e.g. "alice001".
    pub user_id: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub batch_id: Option<Uuid>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub name: String,
    pub user_id: String,
    pub password_hash: String,
    pub email: String,
    pub batch_id: Option<Uuid>,
}
