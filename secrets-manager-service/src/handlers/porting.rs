use crate::dtos::{ExportDocument, ExportFormat, ExportParams, ImportBatch, ImportSummary};
use crate::middleware::CallerContext;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn export_organization(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
    Query(params): Query<ExportParams>,
) -> Result<Json<ExportDocument>, AppError> {
    caller.require_porting_access(organization_id)?;

    let format = match params.format.as_deref() {
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?,
        None => ExportFormat::default(),
    };

    let document = state
        .export
        .export(organization_id, caller.user_id, format)
        .await?;

    Ok(Json(document))
}

pub async fn import_organization(
    State(state): State<AppState>,
    caller: CallerContext,
    Path(organization_id): Path<Uuid>,
    batch: Result<Json<ImportBatch>, JsonRejection>,
) -> Result<Json<ImportSummary>, AppError> {
    caller.require_porting_access(organization_id)?;
    let Json(batch) = batch?;

    tracing::info!(
        organization_id = %organization_id,
        user_id = %caller.user_id,
        projects = batch.projects.len(),
        secrets = batch.secrets.len(),
        "Import requested"
    );

    let summary = state.import.import(organization_id, &batch).await?;
    Ok(Json(summary))
}
