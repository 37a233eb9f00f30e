//! Secret model with trash (soft-delete) semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A secret value, optionally filed under a single project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub key: String,
    pub value: String,
    pub note: String,
    pub project_id: Option<Uuid>,
    pub creation_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
    /// Set when the secret is moved to the trash.
    pub deleted_date: Option<DateTime<Utc>>,
}

impl Secret {
    pub fn new(
        organization_id: Uuid,
        input: NewSecret,
        project_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            key: input.key,
            value: input.value,
            note: input.note,
            project_id,
            creation_date: now,
            revision_date: now,
            deleted_date: None,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_date.is_some()
    }

    /// Whether the trash sweeper may remove this secret at `cutoff`.
    pub fn is_purgeable(&self, cutoff: DateTime<Utc>) -> bool {
        self.deleted_date.is_some_and(|deleted| deleted <= cutoff)
    }
}

/// Input for creating a secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSecret {
    pub key: String,
    pub value: String,
    pub note: String,
}
