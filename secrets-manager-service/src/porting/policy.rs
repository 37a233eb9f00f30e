//! Import quota and relationship rules.
//!
//! Pure checks over a batch; nothing here touches the store.

use crate::dtos::ImportBatch;
use service_core::error::AppError;
use std::collections::HashSet;
use thiserror::Error;

pub const MAX_IMPORT_PROJECTS: usize = 1000;
pub const MAX_IMPORT_SECRETS: usize = 6000;

/// Request body ceiling for the import route. A batch at both quotas with
/// encrypted values and notes of tens of kilobytes each must still reach
/// [`validate_import`] rather than be cut off while buffering.
pub const MAX_IMPORT_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Why a batch was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportViolation {
    #[error(
        "You cannot import this much data at once, the limit is {} projects and {} secrets.",
        MAX_IMPORT_PROJECTS,
        MAX_IMPORT_SECRETS
    )]
    SizeLimit { projects: usize, secrets: usize },

    #[error("A secret can only be in one project at a time.")]
    MultipleProjects { secret_index: usize },

    #[error("Secret at position {secret_index} references project '{reference}' which is not part of this import.")]
    UnknownProjectReference {
        secret_index: usize,
        reference: String,
    },
}

impl ImportViolation {
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Self::SizeLimit { .. })
    }

    pub fn is_relationship(&self) -> bool {
        matches!(
            self,
            Self::MultipleProjects { .. } | Self::UnknownProjectReference { .. }
        )
    }
}

impl From<ImportViolation> for AppError {
    fn from(violation: ImportViolation) -> Self {
        AppError::BadRequest(anyhow::Error::new(violation))
    }
}

/// A batch that passed [`validate_import`]. Only this module can build one,
/// so holding it proves the checks ran.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedImport<'a> {
    batch: &'a ImportBatch,
}

impl<'a> ValidatedImport<'a> {
    pub fn batch(&self) -> &'a ImportBatch {
        self.batch
    }
}

/// Check a batch against the size ceilings and relationship rules.
///
/// Size is checked first. Duplicate names or local ids are not rejected.
pub fn validate_import(batch: &ImportBatch) -> Result<ValidatedImport<'_>, ImportViolation> {
    if batch.projects.len() > MAX_IMPORT_PROJECTS || batch.secrets.len() > MAX_IMPORT_SECRETS {
        return Err(ImportViolation::SizeLimit {
            projects: batch.projects.len(),
            secrets: batch.secrets.len(),
        });
    }

    if let Some(secret_index) = batch.secrets.iter().position(|s| s.project_ids.len() > 1) {
        return Err(ImportViolation::MultipleProjects { secret_index });
    }

    let local_ids: HashSet<&str> = batch.projects.iter().map(|p| p.id.as_str()).collect();
    for (secret_index, secret) in batch.secrets.iter().enumerate() {
        if let Some(reference) = secret.project_ref() {
            if !local_ids.contains(reference) {
                return Err(ImportViolation::UnknownProjectReference {
                    secret_index,
                    reference: reference.to_string(),
                });
            }
        }
    }

    Ok(ValidatedImport { batch })
}
