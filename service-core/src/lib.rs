//! service-core: Shared infrastructure for micros microservices.
//!
//! Error type and HTTP error mapping, layered configuration, tracing setup and
//! the request-id middleware used by every service router.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use sqlx;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
