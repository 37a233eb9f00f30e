//! Organization export.

use crate::dtos::{ExportDocument, ExportFormat};
use crate::models::AccessMode;
use crate::services::{record_error, record_export, EntityStore};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Reads every project and live secret of an organization into an
/// [`ExportDocument`].
///
/// Uses the organization-admin read mode with no per-item checks, so the
/// requester must already be authorized for the organization. An
/// organization with neither projects nor secrets is reported as not found.
#[derive(Clone)]
pub struct ExportAssembler {
    store: Arc<dyn EntityStore>,
}

impl ExportAssembler {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(organization_id = %organization_id, requester = %requester_user_id))]
    pub async fn export(
        &self,
        organization_id: Uuid,
        requester_user_id: Uuid,
        format: ExportFormat,
    ) -> Result<ExportDocument, AppError> {
        let projects = self
            .store
            .list_projects_by_org(organization_id, requester_user_id, AccessMode::NoAccessCheck)
            .await
            .map_err(export_failed)?;
        let secrets = self
            .store
            .list_secrets_by_org(organization_id, requester_user_id, AccessMode::NoAccessCheck)
            .await
            .map_err(export_failed)?;

        if projects.is_empty() && secrets.is_empty() {
            record_export("not_found");
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Nothing to export for organization {}",
                organization_id
            )));
        }

        let document = match format {
            ExportFormat::Json => ExportDocument {
                projects: projects.into_iter().map(Into::into).collect(),
                secrets: secrets.into_iter().map(Into::into).collect(),
            },
        };

        record_export("ok");
        info!(
            projects = document.projects.len(),
            secrets = document.secrets.len(),
            "Export assembled"
        );

        Ok(document)
    }
}

fn export_failed(e: AppError) -> AppError {
    record_export("error");
    record_error(e.kind());
    error!(error = %e, "Export failed reading the store");
    e
}
