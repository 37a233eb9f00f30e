//! Services module for secrets-manager-service.

pub mod database;
#[cfg(test)]
pub mod faulty;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use memory::InMemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_error, record_export, record_http_request, record_import,
    record_sweep,
};
pub use store::EntityStore;
