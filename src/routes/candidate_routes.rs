use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::candidate_dto::{
    AnswerItem, AnswersResponse, LoginRequest, LoginResponse, McqItem, McqsResponse,
    MessageResponse, ProfileResponse, SaveAnswerRequest, StartExamResponse, SubmitResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::{create_token, Claims};
use crate::models::candidate::Candidate;
use crate::utils::credentials::verify_password;
use crate::AppState;

const CANDIDATE_TOKEN_HOURS: i64 = 12;
const DATE_FORMAT: &str = "%d-%m-%Y";

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    payload.validate()?;

    let candidate = state
        .store
        .candidate_by_user_id(&payload.user_id)
        .await
        .map_err(|_| Error::Unauthorized("Invalid user id or password".to_string()))?;
    if !candidate.is_active {
        return Err(Error::Unauthorized("Account is deactivated".to_string()));
    }

    let verified = verify_password(&payload.password, &candidate.password_hash)
        .map_err(|err| Error::Internal(format!("Password verification failed: {}", err)))?;
    if !verified {
        return Err(Error::Unauthorized(
            "Invalid user id or password".to_string(),
        ));
    }

    let is_submitted = match candidate.batch_id {
        Some(batch_id) => {
            state
                .store
                .submitted_session_exists(candidate.id, batch_id)
                .await?
        }
        None => false,
    };

    state
        .store
        .record_login(candidate.id, chrono::Utc::now())
        .await?;
    let token = create_token(&candidate.user_id, "candidate", CANDIDATE_TOKEN_HOURS)?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token: token,
        candidate_name: candidate.name,
        batch_id: candidate.batch_id,
        is_submitted,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let candidate = current_candidate(&state, &claims).await?;
    let batch_id = candidate.batch_id.ok_or(Error::NotAssignedToBatch)?;
    let batch = state.store.batch_by_id(batch_id).await?;

    Ok(Json(ProfileResponse {
        candidate_name: candidate.name,
        batch_title: batch.title,
        exam_start_date: batch.start_date.format(DATE_FORMAT).to_string(),
        exam_end_date: batch.end_date.format(DATE_FORMAT).to_string(),
        exam_duration: batch.exam_duration_minutes,
    })
    .into_response())
}

/// The candidate's fixed paper, without correct answers.
#[axum::debug_handler]
pub async fn assigned_mcqs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let candidate = current_candidate(&state, &claims).await?;
    let assignments = state.store.assignments_for_candidate(candidate.id).await?;
    let ids: Vec<i32> = assignments.iter().map(|a| a.question_id).collect();
    let mut questions = state.store.questions_by_ids(&ids).await?;
    questions.sort_by_key(|q| q.id);

    let mcqs = questions
        .into_iter()
        .map(|q| McqItem {
            question_id: q.id,
            question: q.question,
            options: q.options,
        })
        .collect();
    Ok(Json(McqsResponse { mcqs }).into_response())
}

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let candidate = current_candidate(&state, &claims).await?;
    let start = state.session_service.start(candidate.id).await?;
    let resumed = start.resumed();
    let session = start.session();

    Ok(Json(StartExamResponse {
        message: if resumed {
            "Exam session resumed".to_string()
        } else {
            "Exam session started".to_string()
        },
        session_id: session.id,
        started_at: session.started_at,
        resumed,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<Response> {
    payload.validate()?;
    let candidate = current_candidate(&state, &claims).await?;
    state
        .answer_service
        .save_answer(candidate.id, payload.question_id, &payload.answer)
        .await?;

    Ok(Json(MessageResponse {
        message: "Answer saved successfully".to_string(),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn saved_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let candidate = current_candidate(&state, &claims).await?;
    let answers = state
        .answer_service
        .answers(candidate.id)
        .await?
        .into_iter()
        .map(|a| AnswerItem {
            question_id: a.question_id,
            selected_option: a.selected_option,
            is_saved: a.is_saved,
            answered_at: a.answered_at,
        })
        .collect();
    Ok(Json(AnswersResponse { answers }).into_response())
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let candidate = current_candidate(&state, &claims).await?;
    let summary = state.session_service.submit(candidate.id).await?;

    Ok(Json(SubmitResponse {
        message: "Exam submitted successfully".to_string(),
        exam_duration_used_minutes: summary.exam_duration_used_minutes,
        duration_status: summary.duration_status,
        unanswered_question_ids: summary.unanswered_question_ids,
    })
    .into_response())
}

async fn current_candidate(state: &AppState, claims: &Claims) -> Result<Candidate> {
    state
        .store
        .candidate_by_user_id(&claims.sub)
        .await
        .map_err(|_| Error::Unauthorized("Unknown candidate".to_string()))
}
