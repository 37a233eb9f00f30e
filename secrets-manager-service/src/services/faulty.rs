//! Test double that injects store failures around an [`InMemoryStore`].

use crate::models::{
    AccessMode, AuthRequest, AuthRequestResponse, NewAuthRequest, NewSecret, Project, Secret,
};
use crate::services::{EntityStore, InMemoryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub secret_writes: bool,
    pub secret_reads: bool,
}

pub struct FaultyStore {
    pub inner: InMemoryStore,
    faults: Faults,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: InMemoryStore::new(),
            faults,
        }
    }
}

fn disk_full() -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("disk full"))
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_project(&self, org: Uuid, name: &str) -> Result<Project, AppError> {
        self.inner.create_project(org, name).await
    }

    async fn list_projects_by_org(
        &self,
        org: Uuid,
        user: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Project>, AppError> {
        self.inner.list_projects_by_org(org, user, mode).await
    }

    async fn grant_project_access(&self, user: Uuid, project: Uuid) -> Result<(), AppError> {
        self.inner.grant_project_access(user, project).await
    }

    async fn create_secret(
        &self,
        org: Uuid,
        secret: NewSecret,
        project: Option<Uuid>,
    ) -> Result<Secret, AppError> {
        if self.faults.secret_writes {
            return Err(disk_full());
        }
        self.inner.create_secret(org, secret, project).await
    }

    async fn list_secrets_by_org(
        &self,
        org: Uuid,
        user: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Secret>, AppError> {
        if self.faults.secret_reads {
            return Err(disk_full());
        }
        self.inner.list_secrets_by_org(org, user, mode).await
    }

    async fn trash_secrets(
        &self,
        org: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.inner.trash_secrets(org, ids, now).await
    }

    async fn restore_secrets(&self, org: Uuid, ids: &[Uuid]) -> Result<u64, AppError> {
        self.inner.restore_secrets(org, ids).await
    }

    async fn list_trashed_secrets(&self, org: Uuid) -> Result<Vec<Secret>, AppError> {
        self.inner.list_trashed_secrets(org).await
    }

    async fn delete_trashed_secrets_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.inner.delete_trashed_secrets_older_than(cutoff).await
    }

    async fn create_auth_request(&self, input: NewAuthRequest) -> Result<AuthRequest, AppError> {
        self.inner.create_auth_request(input).await
    }

    async fn list_auth_requests_by_user(&self, user: Uuid) -> Result<Vec<AuthRequest>, AppError> {
        self.inner.list_auth_requests_by_user(user).await
    }

    async fn get_auth_request(
        &self,
        id: Uuid,
        user: Uuid,
    ) -> Result<Option<AuthRequest>, AppError> {
        self.inner.get_auth_request(id, user).await
    }

    async fn respond_to_auth_request(
        &self,
        id: Uuid,
        user: Uuid,
        response: AuthRequestResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthRequest>, AppError> {
        self.inner.respond_to_auth_request(id, user, response, now).await
    }

    async fn delete_expired_auth_requests(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        self.inner.delete_expired_auth_requests(cutoff).await
    }
}
