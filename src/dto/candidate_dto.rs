use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub candidate_name: String,
    pub batch_id: Option<Uuid>,
    pub is_submitted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub candidate_name: String,
    pub batch_title: String,
    /// Dates formatted as dd-mm-yyyy.
    pub exam_start_date: String,
    pub exam_end_date: String,
    pub exam_duration: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct McqItem {
    pub question_id: i32,
    pub question: String,
    pub options: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct McqsResponse {
    pub mcqs: Vec<McqItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartExamResponse {
    pub message: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub resumed: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub question_id: i32,
    #[validate(length(min = 1))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerItem {
    pub question_id: i32,
    pub selected_option: String,
    pub is_saved: bool,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswersResponse {
    pub answers: Vec<AnswerItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub exam_duration_used_minutes: f64,
    pub duration_status: String,
    pub unanswered_question_ids: Vec<i32>,
}
