//! Caller identity set by the gateway.
//!
//! The gateway authenticates the user and resolves their organization
//! membership before forwarding, so these headers are trusted as-is.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const ORG_ID_HEADER: &str = "X-Org-ID";
pub const ORG_ROLE_HEADER: &str = "X-Org-Role";
pub const SECRETS_MANAGER_HEADER: &str = "X-Secrets-Manager";

/// Membership role within the caller's organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRole {
    Owner,
    Admin,
    User,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("Invalid organization role: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: OrgRole,
    /// Whether the organization has secrets manager enabled for this member.
    pub secrets_manager: bool,
}

impl CallerContext {
    pub fn is_org_admin(&self) -> bool {
        matches!(self.role, OrgRole::Owner | OrgRole::Admin)
    }

    /// Member of `organization_id` with secrets manager access.
    pub fn can_access(&self, organization_id: Uuid) -> bool {
        self.organization_id == organization_id && self.secrets_manager
    }

    /// Allowed to import into or export out of `organization_id`.
    pub fn can_port(&self, organization_id: Uuid) -> bool {
        self.can_access(organization_id) && self.is_org_admin()
    }

    /// Fails with `NotFound` so the organization's existence is not revealed.
    pub fn require_access(&self, organization_id: Uuid) -> Result<(), AppError> {
        if self.can_access(organization_id) {
            Ok(())
        } else {
            Err(not_found(organization_id))
        }
    }

    /// Organization-wide writes: import, export and trash management.
    pub fn require_porting_access(&self, organization_id: Uuid) -> Result<(), AppError> {
        if self.can_port(organization_id) {
            Ok(())
        } else {
            Err(not_found(organization_id))
        }
    }
}

fn not_found(organization_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!(
        "Organization {} not found for caller",
        organization_id
    ))
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing {} header", name)))
}

fn uuid_header(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let raw = header(parts, name)?;
    Uuid::parse_str(raw)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = uuid_header(parts, USER_ID_HEADER)?;
        let organization_id = uuid_header(parts, ORG_ID_HEADER)?;
        let role = header(parts, ORG_ROLE_HEADER)?
            .parse::<OrgRole>()
            .map_err(|e| AppError::AuthError(anyhow::anyhow!(e)))?;
        let secrets_manager = parts
            .headers
            .get(SECRETS_MANAGER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        tracing::debug!(
            user_id = %user_id,
            organization_id = %organization_id,
            role = role.as_str(),
            "Caller context extracted"
        );

        Ok(Self {
            user_id,
            organization_id,
            role,
            secrets_manager,
        })
    }
}

/// User id only, for endpoints that are not organization-scoped.
#[derive(Debug, Clone, Copy)]
pub struct CallerUserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CallerUserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        uuid_header(parts, USER_ID_HEADER).map(CallerUserId)
    }
}
