//! Domain models for secrets-manager-service.

mod access;
mod auth_request;
mod project;
mod secret;

pub use access::AccessMode;
pub use auth_request::{AuthRequest, AuthRequestResponse, AuthRequestType, NewAuthRequest};
pub use project::Project;
pub use secret::{NewSecret, Secret};
