#![allow(dead_code)]

use secrets_manager_service::config::{
    DatabaseConfig, RetentionConfig, SecretsManagerConfig, MEMORY_DATABASE_URL,
};
use secrets_manager_service::services::{EntityStore, InMemoryStore};
use secrets_manager_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,secrets_manager_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Caller identity sent as gateway headers.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: &'static str,
    pub secrets_manager: bool,
}

impl Caller {
    pub fn owner(org_id: Uuid) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            org_id,
            role: "owner",
            secrets_manager: true,
        }
    }

    pub fn member(org_id: Uuid) -> Self {
        Self {
            role: "user",
            ..Self::owner(org_id)
        }
    }
}

pub fn test_config() -> SecretsManagerConfig {
    SecretsManagerConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            environment: "test".to_string(),
        },
        service_name: "secrets-manager-service".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        // Sweeps are driven explicitly by the tests that need them
        retention: RetentionConfig {
            enabled: false,
            ..RetentionConfig::default()
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let store = Arc::new(InMemoryStore::new());
        let app = Application::build_with_store(test_config(), store.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped(std::future::pending()).await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, caller: &Caller, path: &str) -> reqwest::RequestBuilder {
        with_caller(self.client.get(self.url(path)), caller)
    }

    pub fn post(&self, caller: &Caller, path: &str) -> reqwest::RequestBuilder {
        with_caller(self.client.post(self.url(path)), caller)
    }

    pub fn put(&self, caller: &Caller, path: &str) -> reqwest::RequestBuilder {
        with_caller(self.client.put(self.url(path)), caller)
    }

    /// Seed a project directly in the store.
    pub async fn seed_project(&self, org_id: Uuid, name: &str) -> Uuid {
        self.store
            .create_project(org_id, name)
            .await
            .expect("Failed to seed project")
            .id
    }
}

pub fn with_caller(builder: reqwest::RequestBuilder, caller: &Caller) -> reqwest::RequestBuilder {
    builder
        .header("X-User-ID", caller.user_id.to_string())
        .header("X-Org-ID", caller.org_id.to_string())
        .header("X-Org-Role", caller.role)
        .header(
            "X-Secrets-Manager",
            if caller.secrets_manager { "true" } else { "false" },
        )
}
