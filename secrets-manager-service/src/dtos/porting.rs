//! Portable import/export documents.
//!
//! Field names are camelCase so that an exported document can be fed back
//! into an import unchanged.

use crate::models::{Project, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A caller-supplied batch of projects and secrets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    #[serde(default)]
    pub projects: Vec<ProjectDescriptor>,
    #[serde(default)]
    pub secrets: Vec<SecretDescriptor>,
}

/// A project to create. `id` is a local reference that secrets in the same
/// batch use to point at this project; it is not kept as the stored id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub note: String,
    /// Local references into `ImportBatch::projects`. At most one is accepted.
    #[serde(default)]
    pub project_ids: Vec<String>,
}

impl SecretDescriptor {
    pub fn project_ref(&self) -> Option<&str> {
        self.project_ids.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub projects: usize,
    pub secrets: usize,
}

/// Everything exported from one organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub projects: Vec<ExportedProject>,
    pub secrets: Vec<ExportedSecret>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedProject {
    pub id: Uuid,
    pub name: String,
}

impl From<Project> for ExportedProject {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSecret {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    pub note: String,
    pub project_ids: Vec<Uuid>,
}

impl From<Secret> for ExportedSecret {
    fn from(secret: Secret) -> Self {
        Self {
            id: secret.id,
            key: secret.key,
            value: secret.value,
            note: secret.note,
            project_ids: secret.project_id.into_iter().collect(),
        }
    }
}

/// Serialization of an export. JSON is the only encoding offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unsupported export format: {}", s)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}
