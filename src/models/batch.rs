use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Batch {
    pub id: Uuid,
    pub title: String,
    pub exam_duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_candidates: i32,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub title: String,
    pub exam_duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_candidates: i32,
    pub created_by: Option<Uuid>,
}
