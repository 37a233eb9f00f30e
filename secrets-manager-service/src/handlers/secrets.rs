use crate::dtos::{
    ProjectListResponse, SecretIdsRequest, SecretListResponse, UpdatedCountResponse,
};
use crate::middleware::CallerContext;
use crate::models::AccessMode;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn list_projects(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<ProjectListResponse>, AppError> {
    caller.require_access(organization_id)?;
    let mode = AccessMode::for_caller(caller.is_org_admin());

    let projects = state
        .store
        .list_projects_by_org(organization_id, caller.user_id, mode)
        .await?;

    Ok(Json(ProjectListResponse {
        projects: projects.into_iter().map(Into::into).collect(),
    }))
}

pub async fn list_secrets(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<SecretListResponse>, AppError> {
    caller.require_access(organization_id)?;
    let mode = AccessMode::for_caller(caller.is_org_admin());

    let secrets = state
        .store
        .list_secrets_by_org(organization_id, caller.user_id, mode)
        .await?;

    Ok(Json(SecretListResponse {
        secrets: secrets.into_iter().map(Into::into).collect(),
    }))
}

/// Move secrets to the trash. Ids outside the organization or already
/// trashed are skipped.
pub async fn trash_secrets(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
    payload: Result<Json<SecretIdsRequest>, JsonRejection>,
) -> Result<Json<UpdatedCountResponse>, AppError> {
    caller.require_porting_access(organization_id)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let updated = state
        .store
        .trash_secrets(organization_id, &payload.ids, Utc::now())
        .await?;

    tracing::info!(
        organization_id = %organization_id,
        requested = payload.ids.len(),
        updated,
        "Secrets moved to trash"
    );

    Ok(Json(UpdatedCountResponse { updated }))
}

pub async fn list_trash(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<SecretListResponse>, AppError> {
    caller.require_porting_access(organization_id)?;

    let secrets = state.store.list_trashed_secrets(organization_id).await?;
    Ok(Json(SecretListResponse {
        secrets: secrets.into_iter().map(Into::into).collect(),
    }))
}

pub async fn restore_secrets(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
    payload: Result<Json<SecretIdsRequest>, JsonRejection>,
) -> Result<Json<UpdatedCountResponse>, AppError> {
    caller.require_porting_access(organization_id)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let updated = state
        .store
        .restore_secrets(organization_id, &payload.ids)
        .await?;

    tracing::info!(
        organization_id = %organization_id,
        requested = payload.ids.len(),
        updated,
        "Secrets restored from trash"
    );

    Ok(Json(UpdatedCountResponse { updated }))
}
