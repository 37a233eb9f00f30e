//! In-process entity store.
//!
//! Keeps records in insertion order behind a `tokio::sync::RwLock`. Used by
//! the test suite and for local runs with `DATABASE_URL=memory://`.

use crate::models::{
    AccessMode, AuthRequest, AuthRequestResponse, NewAuthRequest, NewSecret, Project, Secret,
};
use crate::services::store::EntityStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    secrets: Vec<Secret>,
    grants: HashSet<(Uuid, Uuid)>,
    auth_requests: Vec<AuthRequest>,
}

impl State {
    fn visible_project_ids(&self, organization_id: Uuid, user_id: Uuid) -> HashSet<Uuid> {
        self.projects
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .filter(|p| self.grants.contains(&(user_id, p.id)))
            .map(|p| p.id)
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a secret's trash marker. Lets tests place secrets at an
    /// arbitrary age without waiting.
    pub async fn set_deleted_date(&self, secret_id: Uuid, deleted_date: Option<DateTime<Utc>>) {
        let mut state = self.state.write().await;
        if let Some(secret) = state.secrets.iter_mut().find(|s| s.id == secret_id) {
            secret.deleted_date = deleted_date;
        }
    }

    /// Overwrite an auth request's creation time.
    pub async fn set_auth_request_creation_date(&self, id: Uuid, creation_date: DateTime<Utc>) {
        let mut state = self.state.write().await;
        if let Some(request) = state.auth_requests.iter_mut().find(|r| r.id == id) {
            request.creation_date = creation_date;
        }
    }

    /// Every secret in the store, trashed or not.
    pub async fn all_secrets(&self) -> Vec<Secret> {
        self.state.read().await.secrets.clone()
    }

    /// Every project in the store.
    pub async fn all_projects(&self) -> Vec<Project> {
        self.state.read().await.projects.clone()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_project(&self, organization_id: Uuid, name: &str) -> Result<Project, AppError> {
        let project = Project::new(organization_id, name.to_string(), Utc::now());
        self.state.write().await.projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Project>, AppError> {
        let state = self.state.read().await;
        let projects = match mode {
            AccessMode::NoAccessCheck => state
                .projects
                .iter()
                .filter(|p| p.organization_id == organization_id)
                .cloned()
                .collect(),
            AccessMode::User => {
                let visible = state.visible_project_ids(organization_id, user_id);
                state
                    .projects
                    .iter()
                    .filter(|p| visible.contains(&p.id))
                    .cloned()
                    .collect()
            }
        };
        Ok(projects)
    }

    async fn grant_project_access(&self, user_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if !state.projects.iter().any(|p| p.id == project_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Project {} not found",
                project_id
            )));
        }
        state.grants.insert((user_id, project_id));
        Ok(())
    }

    async fn create_secret(
        &self,
        organization_id: Uuid,
        secret: NewSecret,
        project_id: Option<Uuid>,
    ) -> Result<Secret, AppError> {
        let mut state = self.state.write().await;
        if let Some(project_id) = project_id {
            let in_org = state
                .projects
                .iter()
                .any(|p| p.id == project_id && p.organization_id == organization_id);
            if !in_org {
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Project {} not found in organization",
                    project_id
                )));
            }
        }
        let secret = Secret::new(organization_id, secret, project_id, Utc::now());
        state.secrets.push(secret.clone());
        Ok(secret)
    }

    async fn list_secrets_by_org(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        mode: AccessMode,
    ) -> Result<Vec<Secret>, AppError> {
        let state = self.state.read().await;
        let live = state
            .secrets
            .iter()
            .filter(|s| s.organization_id == organization_id && !s.is_trashed());
        let secrets = match mode {
            AccessMode::NoAccessCheck => live.cloned().collect(),
            AccessMode::User => {
                let visible = state.visible_project_ids(organization_id, user_id);
                live.filter(|s| s.project_id.is_some_and(|p| visible.contains(&p)))
                    .cloned()
                    .collect()
            }
        };
        Ok(secrets)
    }

    async fn trash_secrets(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        let mut trashed = 0;
        for secret in state.secrets.iter_mut().filter(|s| {
            s.organization_id == organization_id && !s.is_trashed() && ids.contains(&s.id)
        }) {
            secret.deleted_date = Some(now);
            secret.revision_date = now;
            trashed += 1;
        }
        Ok(trashed)
    }

    async fn restore_secrets(&self, organization_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut restored = 0;
        for secret in state.secrets.iter_mut().filter(|s| {
            s.organization_id == organization_id && s.is_trashed() && ids.contains(&s.id)
        }) {
            secret.deleted_date = None;
            secret.revision_date = now;
            restored += 1;
        }
        Ok(restored)
    }

    async fn list_trashed_secrets(&self, organization_id: Uuid) -> Result<Vec<Secret>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .secrets
            .iter()
            .filter(|s| s.organization_id == organization_id && s.is_trashed())
            .cloned()
            .collect())
    }

    async fn delete_trashed_secrets_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        let before = state.secrets.len();
        state.secrets.retain(|s| !s.is_purgeable(cutoff));
        Ok((before - state.secrets.len()) as u64)
    }

    async fn create_auth_request(&self, input: NewAuthRequest) -> Result<AuthRequest, AppError> {
        let request = AuthRequest::new(input, Utc::now());
        self.state.write().await.auth_requests.push(request.clone());
        Ok(request)
    }

    async fn list_auth_requests_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AuthRequest>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .auth_requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuthRequest>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .auth_requests
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn respond_to_auth_request(
        &self,
        id: Uuid,
        user_id: Uuid,
        response: AuthRequestResponse,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthRequest>, AppError> {
        let mut state = self.state.write().await;
        let Some(request) = state
            .auth_requests
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id && !r.is_answered())
        else {
            return Ok(None);
        };
        request.apply_response(response, now);
        Ok(Some(request.clone()))
    }

    async fn delete_expired_auth_requests(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        let before = state.auth_requests.len();
        state.auth_requests.retain(|r| !r.is_expired(cutoff));
        Ok((before - state.auth_requests.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_secret(key: &str) -> NewSecret {
        NewSecret {
            key: key.to_string(),
            value: "v".to_string(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn secret_cannot_reference_another_organizations_project() {
        let store = InMemoryStore::new();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        let project = store.create_project(org_a, "A").await.unwrap();

        let err = store
            .create_secret(org_b, new_secret("S"), Some(project.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.all_secrets().await.is_empty());
    }

    #[tokio::test]
    async fn user_mode_only_sees_granted_projects() {
        let store = InMemoryStore::new();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let granted = store.create_project(org, "granted").await.unwrap();
        let hidden = store.create_project(org, "hidden").await.unwrap();
        store.grant_project_access(user, granted.id).await.unwrap();
        store
            .create_secret(org, new_secret("visible"), Some(granted.id))
            .await
            .unwrap();
        store
            .create_secret(org, new_secret("invisible"), Some(hidden.id))
            .await
            .unwrap();
        store
            .create_secret(org, new_secret("unfiled"), None)
            .await
            .unwrap();

        let projects = store
            .list_projects_by_org(org, user, AccessMode::User)
            .await
            .unwrap();
        assert_eq!(projects, vec![granted.clone()]);

        let secrets = store
            .list_secrets_by_org(org, user, AccessMode::User)
            .await
            .unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].key, "visible");

        let all = store
            .list_secrets_by_org(org, user, AccessMode::NoAccessCheck)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn trash_and_restore_are_scoped_to_the_organization() {
        let store = InMemoryStore::new();
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();
        let secret = store.create_secret(org, new_secret("S"), None).await.unwrap();

        assert_eq!(
            store
                .trash_secrets(other, &[secret.id], Utc::now())
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .trash_secrets(org, &[secret.id], Utc::now())
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.list_trashed_secrets(org).await.unwrap().len(), 1);
        assert!(store
            .list_secrets_by_org(org, Uuid::new_v4(), AccessMode::NoAccessCheck)
            .await
            .unwrap()
            .is_empty());

        assert_eq!(store.restore_secrets(org, &[secret.id]).await.unwrap(), 1);
        assert!(store.list_trashed_secrets(org).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn respond_requires_the_owning_user() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let request = store
            .create_auth_request(NewAuthRequest {
                user_id: owner,
                request_type: crate::models::AuthRequestType::Unlock,
                request_device_identifier: "d".to_string(),
                request_ip_address: "127.0.0.1".to_string(),
                access_code: "c".to_string(),
                public_key: "k".to_string(),
            })
            .await
            .unwrap();
        let response = AuthRequestResponse {
            device_id: Uuid::new_v4(),
            approved: true,
            key: None,
            master_password_hash: None,
        };

        let stranger = store
            .respond_to_auth_request(request.id, Uuid::new_v4(), response.clone(), Utc::now())
            .await
            .unwrap();
        assert!(stranger.is_none());

        let answered = store
            .respond_to_auth_request(request.id, owner, response, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answered.approved, Some(true));

        store
            .set_auth_request_creation_date(request.id, Utc::now() - Duration::hours(1))
            .await;
        let removed = store
            .delete_expired_auth_requests(Utc::now() - Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn a_request_is_answered_at_most_once() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let request = store
            .create_auth_request(NewAuthRequest {
                user_id: owner,
                request_type: crate::models::AuthRequestType::AuthenticateAndUnlock,
                request_device_identifier: "d".to_string(),
                request_ip_address: "127.0.0.1".to_string(),
                access_code: "c".to_string(),
                public_key: "k".to_string(),
            })
            .await
            .unwrap();

        let approved = store
            .respond_to_auth_request(
                request.id,
                owner,
                AuthRequestResponse {
                    device_id: Uuid::new_v4(),
                    approved: true,
                    key: Some("key".to_string()),
                    master_password_hash: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(approved.unwrap().approved, Some(true));

        let denied = store
            .respond_to_auth_request(
                request.id,
                owner,
                AuthRequestResponse {
                    device_id: Uuid::new_v4(),
                    approved: false,
                    key: None,
                    master_password_hash: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(denied.is_none());

        let stored = store
            .get_auth_request(request.id, owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.approved, Some(true));
        assert_eq!(stored.key.as_deref(), Some("key"));
    }

    #[tokio::test]
    async fn get_auth_request_is_scoped_to_the_owner() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let request = store
            .create_auth_request(NewAuthRequest {
                user_id: owner,
                request_type: crate::models::AuthRequestType::Unlock,
                request_device_identifier: "d".to_string(),
                request_ip_address: "127.0.0.1".to_string(),
                access_code: "c".to_string(),
                public_key: "k".to_string(),
            })
            .await
            .unwrap();

        assert!(store
            .get_auth_request(request.id, owner)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get_auth_request(request.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }
}
