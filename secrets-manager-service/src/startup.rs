//! Application startup and lifecycle management.

use crate::config::SecretsManagerConfig;
use crate::handlers;
use crate::jobs::SweepScheduler;
use crate::porting::{ExportAssembler, ImportCommand, MAX_IMPORT_BODY_BYTES};
use crate::services::{
    init_metrics, record_error, record_http_request, Database, EntityStore, InMemoryStore,
};
use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: SecretsManagerConfig,
    pub store: Arc<dyn EntityStore>,
    pub import: ImportCommand,
    pub export: ExportAssembler,
}

impl AppState {
    pub fn new(config: SecretsManagerConfig, store: Arc<dyn EntityStore>) -> Self {
        Self {
            config,
            import: ImportCommand::new(store.clone()),
            export: ExportAssembler::new(store.clone()),
            store,
        }
    }
}

/// Count every response by matched route template and status.
async fn http_metrics_middleware(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    let status = response.status();

    record_http_request(&route, status.as_u16());
    if status.is_server_error() {
        record_error("http_5xx");
    }

    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/sm/:org_id/export", get(handlers::export_organization))
        .route(
            "/sm/:org_id/import",
            post(handlers::import_organization)
                .layer(DefaultBodyLimit::max(MAX_IMPORT_BODY_BYTES)),
        )
        .route("/sm/:org_id/projects", get(handlers::list_projects))
        .route("/sm/:org_id/secrets", get(handlers::list_secrets))
        .route("/sm/:org_id/secrets/delete", post(handlers::trash_secrets))
        .route("/sm/:org_id/trash", get(handlers::list_trash))
        .route("/sm/:org_id/trash/restore", post(handlers::restore_secrets))
        .route(
            "/auth-requests",
            post(handlers::create_auth_request).get(handlers::list_auth_requests),
        )
        .route("/auth-requests/:id", put(handlers::respond_to_auth_request))
        .route_layer(middleware::from_fn(http_metrics_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, connecting to PostgreSQL and running migrations
    /// unless `DATABASE_URL` selects the in-memory store.
    pub async fn build(config: SecretsManagerConfig) -> Result<Self, AppError> {
        let store: Arc<dyn EntityStore> = if config.database.is_memory() {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Arc::new(InMemoryStore::new())
        } else {
            let db = Database::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;

            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;

            Arc::new(db)
        };

        Self::build_with_store(config, store).await
    }

    /// Build the application over an existing store.
    pub async fn build_with_store(
        config: SecretsManagerConfig,
        store: Arc<dyn EntityStore>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Secrets manager listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, store),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> Arc<dyn EntityStore> {
        self.state.store.clone()
    }

    /// Serve HTTP and run the retention sweeps until `shutdown` resolves.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scheduler =
            SweepScheduler::new(&self.state.config.retention, self.state.store.clone());
        let sweep_handles = scheduler.start();

        let app = router(self.state);

        tracing::info!(port = self.port, "HTTP server starting");
        let result = axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        scheduler.shutdown();
        for handle in sweep_handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sweep task ended abnormally");
            }
        }

        tracing::info!("HTTP server stopped");
        result
    }
}
