use crate::models::{Project, Secret};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SecretIdsRequest {
    #[validate(length(min = 1, max = 1000))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedCountResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            organization_id: project.organization_id,
            name: project.name,
            creation_date: project.creation_date,
            revision_date: project.revision_date,
        }
    }
}

/// Secret metadata. Listings never carry the value.
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub key: String,
    pub project_id: Option<Uuid>,
    pub creation_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

impl From<Secret> for SecretView {
    fn from(secret: Secret) -> Self {
        Self {
            id: secret.id,
            organization_id: secret.organization_id,
            key: secret.key,
            project_id: secret.project_id,
            creation_date: secret.creation_date,
            revision_date: secret.revision_date,
            deleted_date: secret.deleted_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecretListResponse {
    pub secrets: Vec<SecretView>,
}
