//! Retention sweeps: permanent removal of records past their grace window.

use crate::services::{record_error, record_sweep, EntityStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Trashed secrets can be restored for this many days.
pub const SECRET_TRASH_RETENTION_DAYS: i64 = 30;

/// Auth requests are answerable for this many minutes.
pub const AUTH_REQUEST_EXPIRATION_MINUTES: i64 = 15;

/// How long a record survives before a sweep may remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow(Duration);

impl RetentionWindow {
    pub fn days(days: i64) -> Self {
        Self(Duration::days(days))
    }

    pub fn minutes(minutes: i64) -> Self {
        Self(Duration::minutes(minutes))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Records stamped at or before this instant are eligible.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.0
    }
}

/// A kind of record with a timestamp and a bulk delete-before operation.
#[async_trait]
pub trait RetentionTarget: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    fn window(&self) -> RetentionWindow;

    /// Delete every record whose timestamp is `<= cutoff`; return the count.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Secrets in the trash, keyed on `deleted_date`.
pub struct SecretTrash {
    store: Arc<dyn EntityStore>,
}

impl SecretTrash {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetentionTarget for SecretTrash {
    fn name(&self) -> &'static str {
        "secret_trash"
    }

    fn window(&self) -> RetentionWindow {
        RetentionWindow::days(SECRET_TRASH_RETENTION_DAYS)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        self.store.delete_trashed_secrets_older_than(cutoff).await
    }
}

/// Auth requests, keyed on `creation_date`, answered or not.
pub struct ExpiredAuthRequests {
    store: Arc<dyn EntityStore>,
}

impl ExpiredAuthRequests {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetentionTarget for ExpiredAuthRequests {
    fn name(&self) -> &'static str {
        "expired_auth_requests"
    }

    fn window(&self) -> RetentionWindow {
        RetentionWindow::minutes(AUTH_REQUEST_EXPIRATION_MINUTES)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        self.store.delete_expired_auth_requests(cutoff).await
    }
}

/// Outcome of one sweep. The count is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub target: &'static str,
    pub cutoff: DateTime<Utc>,
    pub removed: u64,
}

/// Runs a single idempotent delete-before-cutoff for one target.
pub struct RetentionSweeper<T> {
    target: T,
}

impl<T: RetentionTarget> RetentionSweeper<T> {
    pub fn new(target: T) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    #[instrument(skip(self), fields(sweep = self.target.name()))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let name = self.target.name();
        let cutoff = self.target.window().cutoff(now);

        match self.target.purge_before(cutoff).await {
            Ok(removed) => {
                record_sweep(name, Some(removed));
                info!(sweep = name, cutoff = %cutoff, removed, "Retention sweep completed");
                Ok(SweepReport {
                    target: name,
                    cutoff,
                    removed,
                })
            }
            Err(e) => {
                record_sweep(name, None);
                record_error(e.kind());
                error!(sweep = name, cutoff = %cutoff, error = %e, "Retention sweep failed");
                Err(e)
            }
        }
    }
}

/// Object-safe handle so sweepers over different targets can share a scheduler.
#[async_trait]
pub trait SweepJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError>;
}

#[async_trait]
impl<T: RetentionTarget> SweepJob for RetentionSweeper<T> {
    fn name(&self) -> &'static str {
        self.target.name()
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        self.sweep(now).await
    }
}
