use crate::dtos::{AuthRequestView, CreateAuthRequestBody, RespondAuthRequestBody};
use crate::jobs::{RetentionWindow, AUTH_REQUEST_EXPIRATION_MINUTES};
use crate::middleware::CallerUserId;
use crate::models::{AuthRequestResponse, NewAuthRequest};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn create_auth_request(
    State(state): State<AppState>,
    CallerUserId(user_id): CallerUserId,
    headers: HeaderMap,
    payload: Result<Json<CreateAuthRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthRequestView>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let request = state
        .store
        .create_auth_request(NewAuthRequest {
            user_id,
            request_type: payload.request_type,
            request_device_identifier: payload.device_identifier,
            request_ip_address: client_ip(&headers),
            access_code: payload.access_code,
            public_key: payload.public_key,
        })
        .await?;

    tracing::info!(
        auth_request_id = %request.id,
        user_id = %user_id,
        request_type = %request.request_type,
        "Auth request created"
    );

    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn list_auth_requests(
    State(state): State<AppState>,
    CallerUserId(user_id): CallerUserId,
) -> Result<Json<Vec<AuthRequestView>>, AppError> {
    let requests = state.store.list_auth_requests_by_user(user_id).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Approve or deny a pending request. Expired requests look the same as
/// missing ones; a request can only be answered once.
pub async fn respond_to_auth_request(
    State(state): State<AppState>,
    CallerUserId(user_id): CallerUserId,
    Path(id): Path<Uuid>,
    payload: Result<Json<RespondAuthRequestBody>, JsonRejection>,
) -> Result<Json<AuthRequestView>, AppError> {
    let Json(payload) = payload?;
    let now = Utc::now();
    let cutoff = RetentionWindow::minutes(AUTH_REQUEST_EXPIRATION_MINUTES).cutoff(now);
    let not_found = || AppError::NotFound(anyhow::anyhow!("Auth request {} not found", id));

    let existing = state
        .store
        .get_auth_request(id, user_id)
        .await?
        .ok_or_else(not_found)?;

    if existing.is_expired(cutoff) {
        return Err(not_found());
    }
    let already_answered = || {
        AppError::Conflict(anyhow::anyhow!(
            "Auth request {} has already been answered",
            id
        ))
    };
    if existing.is_answered() {
        return Err(already_answered());
    }

    let updated = state
        .store
        .respond_to_auth_request(
            id,
            user_id,
            AuthRequestResponse {
                device_id: payload.device_id,
                approved: payload.approved,
                key: payload.key,
                master_password_hash: payload.master_password_hash,
            },
            now,
        )
        .await?
        // Another response landed between the read and the write
        .ok_or_else(already_answered)?;

    tracing::info!(
        auth_request_id = %id,
        approved = payload.approved,
        "Auth request answered"
    );

    Ok(Json(updated.into()))
}
