use crate::models::{AuthRequest, AuthRequestType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuthRequestBody {
    pub request_type: AuthRequestType,
    #[validate(length(min = 1, max = 50))]
    pub device_identifier: String,
    #[validate(length(min = 1, max = 25))]
    pub access_code: String,
    #[validate(length(min = 1))]
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondAuthRequestBody {
    pub device_id: Uuid,
    pub approved: bool,
    pub key: Option<String>,
    pub master_password_hash: Option<String>,
}

/// Auth request as returned to the owning user. The access code is omitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRequestView {
    pub id: Uuid,
    pub request_type: String,
    pub request_device_identifier: String,
    pub request_ip_address: String,
    pub public_key: String,
    pub key: Option<String>,
    pub master_password_hash: Option<String>,
    pub approved: Option<bool>,
    pub response_device_id: Option<Uuid>,
    pub creation_date: DateTime<Utc>,
    pub response_date: Option<DateTime<Utc>>,
}

impl From<AuthRequest> for AuthRequestView {
    fn from(request: AuthRequest) -> Self {
        Self {
            id: request.id,
            request_type: request.request_type,
            request_device_identifier: request.request_device_identifier,
            request_ip_address: request.request_ip_address,
            public_key: request.public_key,
            key: request.key,
            master_password_hash: request.master_password_hash,
            approved: request.approved,
            response_device_id: request.response_device_id,
            creation_date: request.creation_date,
            response_date: request.response_date,
        }
    }
}
