pub mod auth_requests;
pub mod health;
pub mod porting;
pub mod secrets;

pub use auth_requests::{create_auth_request, list_auth_requests, respond_to_auth_request};
pub use health::{health_check, metrics_handler, readiness_check};
pub use porting::{export_organization, import_organization};
pub use secrets::{list_projects, list_secrets, list_trash, restore_secrets, trash_secrets};
