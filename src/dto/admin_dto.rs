use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::NewQuestion;
use crate::services::allocation_service::AllocationFailure;
use crate::services::result_service::CandidateResult;
use crate::services::roster_service::{ProvisionedCandidate, RosterEntry};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterAdminRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLoginResponse {
    pub message: String,
    pub access_token: String,
    pub admin_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(range(min = 1))]
    pub exam_duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub candidates: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBatchResponse {
    pub message: String,
    pub batch_id: Uuid,
    pub batch_title: String,
    pub provisioned: Vec<ProvisionedCandidate>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImportQuestionsRequest {
    #[validate(length(min = 1))]
    pub questions: Vec<NewQuestion>,
}

fn default_num_questions() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignResponse {
    pub message: String,
    pub allocated: usize,
    pub failures: Vec<AllocationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResultsResponse {
    pub batch_title: String,
    pub results: Vec<CandidateResult>,
}
