//! Bulk import of projects and secrets into one organization.

use crate::dtos::{ImportBatch, ImportSummary};
use crate::models::NewSecret;
use crate::porting::policy::{validate_import, ValidatedImport};
use crate::services::{record_error, record_import, EntityStore};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Validate-then-commit import.
///
/// Validation failures are returned before the first write. Once writing has
/// started a store failure is returned as-is and whatever was committed stays
/// committed: projects first, then secrets, so a failure can leave projects
/// without secrets but never a secret pointing at a missing project.
///
/// Dropping the returned future stops the import at the next store call.
#[derive(Clone)]
pub struct ImportCommand {
    store: Arc<dyn EntityStore>,
}

impl ImportCommand {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, batch),
        fields(
            organization_id = %organization_id,
            projects = batch.projects.len(),
            secrets = batch.secrets.len()
        )
    )]
    pub async fn import(
        &self,
        organization_id: Uuid,
        batch: &ImportBatch,
    ) -> Result<ImportSummary, AppError> {
        let validated = validate_import(batch).map_err(|violation| {
            warn!(error = %violation, "Import rejected by policy");
            violation
        })?;

        self.commit(organization_id, validated).await.map_err(|e| {
            record_error(e.kind());
            error!(error = %e, "Import aborted by store failure, earlier writes are kept");
            e
        })
    }

    async fn commit(
        &self,
        organization_id: Uuid,
        validated: ValidatedImport<'_>,
    ) -> Result<ImportSummary, AppError> {
        let batch = validated.batch();

        let mut resolved: HashMap<&str, Uuid> = HashMap::with_capacity(batch.projects.len());
        for descriptor in &batch.projects {
            let project = self
                .store
                .create_project(organization_id, &descriptor.name)
                .await?;
            resolved.entry(descriptor.id.as_str()).or_insert(project.id);
        }

        info!(
            created = batch.projects.len(),
            "Imported projects, importing secrets"
        );

        for descriptor in &batch.secrets {
            // Validation guarantees every reference names a batch project.
            let project_id = descriptor
                .project_ref()
                .and_then(|reference| resolved.get(reference).copied());

            self.store
                .create_secret(
                    organization_id,
                    NewSecret {
                        key: descriptor.key.clone(),
                        value: descriptor.value.clone(),
                        note: descriptor.note.clone(),
                    },
                    project_id,
                )
                .await?;
        }

        let summary = ImportSummary {
            projects: batch.projects.len(),
            secrets: batch.secrets.len(),
        };

        record_import(summary.projects, summary.secrets);
        info!(
            projects = summary.projects,
            secrets = summary.secrets,
            "Import completed"
        );

        Ok(summary)
    }
}
