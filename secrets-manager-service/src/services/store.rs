//! Entity store contract consumed by porting commands and sweep jobs.

use crate::models::{
    AccessMode, AuthRequest, AuthRequestResponse, NewAuthRequest, NewSecret, Project, Secret,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

/// Durable storage for projects, secrets and auth requests.
///
/// Every organization-scoped method takes the organization id explicitly and
/// must never return or modify another organization's records. Transactional
/// guarantees across calls are the implementation's concern; callers do not
/// lock.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Projects
    async fn create_project(&self, organization_id: Uuid, name: &str) -> Result<Project, AppError>;

    async fn list_projects_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Project>, AppError>;

    async fn grant_project_access(&self, user_id: Uuid, project_id: Uuid) -> Result<(), AppError>;

    // Secrets

    /// Create a secret, optionally filed under `project_id`.
    ///
    /// Fails with `NotFound` when the project does not exist in the same
    /// organization, so no secret can point at a missing project.
    async fn create_secret(
        &self,
        organization_id: Uuid,
        secret: NewSecret,
        project_id: Option<Uuid>,
    ) -> Result<Secret, AppError>;

    /// Live (non-trashed) secrets of the organization.
    async fn list_secrets_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Secret>, AppError>;

    async fn trash_secrets(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    async fn restore_secrets(&self, organization_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError>;

    async fn list_trashed_secrets(&self, organization_id: Uuid) -> Result<Vec<Secret>, AppError>;

    /// Permanently delete trashed secrets with `deleted_date <= cutoff`,
    /// across all organizations.
    async fn delete_trashed_secrets_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    // Auth requests
    async fn create_auth_request(&self, input: NewAuthRequest) -> Result<AuthRequest, AppError>;

    async fn list_auth_requests_by_user(&self, user_id: Uuid)
        -> Result<Vec<AuthRequest>, AppError>;

    /// A single request, only if it belongs to `user_id`.
    async fn get_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuthRequest>, AppError>;

    /// Record a response. Returns `None` when the request does not exist,
    /// belongs to another user, or has already been answered. The check and
    /// the write are one atomic step.
    async fn respond_to_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
        response: AuthRequestResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthRequest>, AppError>;

    /// Delete auth requests with `creation_date <= cutoff`, answered or not.
    async fn delete_expired_auth_requests(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
