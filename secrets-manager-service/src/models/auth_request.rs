//! Passwordless login / device approval requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What the requesting device is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequestType {
    AuthenticateAndUnlock,
    Unlock,
    AdminApproval,
}

impl AuthRequestType {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticateAndUnlock => "authenticate_and_unlock",
            Self::Unlock => "unlock",
            Self::AdminApproval => "admin_approval",
        }
    }
}

impl std::fmt::Display for AuthRequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuthRequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticate_and_unlock" => Ok(Self::AuthenticateAndUnlock),
            "unlock" => Ok(Self::Unlock),
            "admin_approval" => Ok(Self::AdminApproval),
            _ => Err(format!("Invalid auth request type: {}", s)),
        }
    }
}

/// Stored auth request.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_type: String,
    pub request_device_identifier: String,
    pub request_ip_address: String,
    pub access_code: String,
    pub public_key: String,
    pub key: Option<String>,
    pub master_password_hash: Option<String>,
    pub approved: Option<bool>,
    pub response_device_id: Option<Uuid>,
    pub creation_date: DateTime<Utc>,
    pub response_date: Option<DateTime<Utc>>,
    pub authentication_date: Option<DateTime<Utc>>,
}

impl AuthRequest {
    pub fn new(input: NewAuthRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            request_type: input.request_type.as_str().to_string(),
            request_device_identifier: input.request_device_identifier,
            request_ip_address: input.request_ip_address,
            access_code: input.access_code,
            public_key: input.public_key,
            key: None,
            master_password_hash: None,
            approved: None,
            response_device_id: None,
            creation_date: now,
            response_date: None,
            authentication_date: None,
        }
    }

    /// Get parsed request type.
    pub fn parsed_type(&self) -> Option<AuthRequestType> {
        self.request_type.parse().ok()
    }

    /// Whether a device has answered this request.
    pub fn is_answered(&self) -> bool {
        self.response_date.is_some()
    }

    /// Whether the expiry sweeper may remove this request at `cutoff`.
    /// Answered and unanswered requests expire alike.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        self.creation_date <= cutoff
    }

    /// Record a device's answer.
    pub fn apply_response(&mut self, response: AuthRequestResponse, now: DateTime<Utc>) {
        self.response_device_id = Some(response.device_id);
        self.approved = Some(response.approved);
        self.response_date = Some(now);
        if response.approved {
            self.key = response.key;
            self.master_password_hash = response.master_password_hash;
        } else {
            self.key = None;
            self.master_password_hash = None;
        }
    }
}

/// Input for creating an auth request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuthRequest {
    pub user_id: Uuid,
    pub request_type: AuthRequestType,
    pub request_device_identifier: String,
    pub request_ip_address: String,
    pub access_code: String,
    pub public_key: String,
}

/// A responding device's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequestResponse {
    pub device_id: Uuid,
    pub approved: bool,
    pub key: Option<String>,
    pub master_password_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(now: DateTime<Utc>) -> AuthRequest {
        AuthRequest::new(
            NewAuthRequest {
                user_id: Uuid::new_v4(),
                request_type: AuthRequestType::AuthenticateAndUnlock,
                request_device_identifier: "device-1".to_string(),
                request_ip_address: "10.0.0.1".to_string(),
                access_code: "code".to_string(),
                public_key: "pk".to_string(),
            },
            now,
        )
    }

    #[test]
    fn request_type_round_trips_through_storage_string() {
        let req = request(Utc::now());
        assert_eq!(
            req.parsed_type(),
            Some(AuthRequestType::AuthenticateAndUnlock)
        );
        assert!("bogus".parse::<AuthRequestType>().is_err());
    }

    #[test]
    fn denied_response_does_not_store_key_material() {
        let now = Utc::now();
        let mut req = request(now);
        req.apply_response(
            AuthRequestResponse {
                device_id: Uuid::new_v4(),
                approved: false,
                key: Some("wrapped".to_string()),
                master_password_hash: Some("hash".to_string()),
            },
            now,
        );
        assert!(req.is_answered());
        assert_eq!(req.approved, Some(false));
        assert!(req.key.is_none());
        assert!(req.master_password_hash.is_none());
    }

    #[test]
    fn answered_requests_still_expire() {
        let now = Utc::now();
        let mut req = request(now - Duration::minutes(20));
        req.apply_response(
            AuthRequestResponse {
                device_id: Uuid::new_v4(),
                approved: true,
                key: Some("wrapped".to_string()),
                master_password_hash: None,
            },
            now - Duration::minutes(19),
        );
        assert!(req.is_expired(now - Duration::minutes(15)));
    }

    #[test]
    fn denial_clears_key_material_already_present() {
        let now = Utc::now();
        let mut req = request(now);
        req.key = Some("stale".to_string());
        req.master_password_hash = Some("stale-hash".to_string());
        req.apply_response(
            AuthRequestResponse {
                device_id: Uuid::new_v4(),
                approved: false,
                key: None,
                master_password_hash: None,
            },
            now,
        );
        assert!(req.key.is_none());
        assert!(req.master_password_hash.is_none());
    }
}
