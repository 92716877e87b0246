use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::admin_dto::{
    AdminLoginRequest, AdminLoginResponse, AssignRequest, AssignResponse, BatchResultsResponse,
    CreateBatchRequest, CreateBatchResponse, ImportQuestionsRequest, RegisterAdminRequest,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::services::roster_service::BatchSpec;
use crate::AppState;

#[axum::debug_handler]
pub async fn register_admin(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> Result<Response> {
    payload.validate()?;
    let admin = state
        .admin_service
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Admin registered successfully",
            "admin_id": admin.id,
        })),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Response> {
    payload.validate()?;
    let (admin, token) = state
        .admin_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(AdminLoginResponse {
        message: "Login successful".to_string(),
        access_token: token,
        admin_name: admin.name,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<Response> {
    payload.validate()?;
    if payload.end_date < payload.start_date {
        return Err(Error::BadRequest(
            "end_date must not be before start_date".to_string(),
        ));
    }

    let report = state
        .roster_service
        .provision_batch(
            BatchSpec {
                title: payload.title,
                exam_duration_minutes: payload.exam_duration_minutes,
                start_date: payload.start_date,
                end_date: payload.end_date,
                created_by: Some(admin_id(&claims)?),
            },
            payload.candidates,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBatchResponse {
            message: "Batch created successfully".to_string(),
            batch_id: report.batch_id,
            batch_title: report.batch_title,
            provisioned: report.provisioned,
            skipped: report.skipped,
        }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn import_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<Response> {
    payload.validate()?;
    let created_by = admin_id(&claims)?;
    let questions = payload
        .questions
        .into_iter()
        .map(|mut q| {
            q.created_by = Some(created_by);
            q
        })
        .collect();
    let imported = state.question_service.import_questions(questions).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Questions imported successfully",
            "imported": imported,
        })),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn batch_candidates(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Response> {
    let batch = state.store.batch_by_id(batch_id).await?;
    let candidates = state.store.candidates_in_batch(batch.id).await?;

    Ok(Json(json!({
        "batch_title": batch.title,
        "candidates": candidates,
    }))
    .into_response())
}

/// Allocates a fixed paper to every candidate in the batch.
#[axum::debug_handler]
pub async fn assign_questions(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Response> {
    let report = state
        .allocation_service
        .allocate_batch(batch_id, payload.num_questions)
        .await?;

    Ok(Json(AssignResponse {
        message: "Question assignment completed".to_string(),
        allocated: report.allocated,
        failures: report.failures,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn batch_results(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<Response> {
    let results = state.result_service.batch_results(batch_id).await?;

    Ok(Json(BatchResultsResponse {
        batch_title: results.batch_title,
        results: results.results,
    })
    .into_response())
}

fn admin_id(claims: &Claims) -> Result<Uuid> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::Unauthorized("Invalid admin token".to_string()))
}
