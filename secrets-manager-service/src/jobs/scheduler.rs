//! Periodic trigger for retention sweeps.

use crate::config::RetentionConfig;
use crate::jobs::sweeper::{
    ExpiredAuthRequests, RetentionSweeper, SecretTrash, SweepJob, SweepReport,
};
use crate::services::EntityStore;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A sweep job and its cadence.
#[derive(Clone)]
pub struct ScheduledSweep {
    pub job: Arc<dyn SweepJob>,
    pub every: Duration,
}

/// Runs each registered sweep on its own interval until shut down.
///
/// Failures are logged and counted; the next tick is the only retry.
pub struct SweepScheduler {
    enabled: bool,
    sweeps: Vec<ScheduledSweep>,
    shutdown_token: CancellationToken,
}

impl SweepScheduler {
    /// Scheduler with the trash and auth-request sweepers registered.
    pub fn new(config: &RetentionConfig, store: Arc<dyn EntityStore>) -> Self {
        let sweeps = vec![
            ScheduledSweep {
                job: Arc::new(RetentionSweeper::new(SecretTrash::new(store.clone()))),
                every: config.trash_sweep_interval(),
            },
            ScheduledSweep {
                job: Arc::new(RetentionSweeper::new(ExpiredAuthRequests::new(store))),
                every: config.auth_request_sweep_interval(),
            },
        ];
        Self::with_sweeps(config.enabled, sweeps)
    }

    pub fn with_sweeps(enabled: bool, sweeps: Vec<ScheduledSweep>) -> Self {
        Self {
            enabled,
            sweeps,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn sweeps(&self) -> &[ScheduledSweep] {
        &self.sweeps
    }

    /// Trigger every registered sweep once, in registration order.
    ///
    /// A failing sweep does not stop the ones after it.
    pub async fn run_all(&self, now: DateTime<Utc>) -> Vec<Result<SweepReport, AppError>> {
        let mut results = Vec::with_capacity(self.sweeps.len());
        for sweep in &self.sweeps {
            results.push(sweep.job.run(now).await);
        }
        results
    }

    /// Spawn one task per sweep. The first run happens immediately.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        if !self.enabled {
            tracing::info!("Retention sweeps disabled by configuration");
            return Vec::new();
        }

        tracing::info!(jobs = self.sweeps.len(), "Starting retention sweep scheduler");

        self.sweeps
            .iter()
            .cloned()
            .map(|sweep| {
                let shutdown = self.shutdown_token.clone();
                tokio::spawn(async move {
                    let name = sweep.job.name();
                    let mut ticker = tokio::time::interval(sweep.every);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    tracing::info!(
                        sweep = name,
                        every_secs = sweep.every.as_secs(),
                        "Sweep scheduled"
                    );

                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => {
                                tracing::info!(sweep = name, "Sweep task shutting down");
                                break;
                            }
                            _ = ticker.tick() => {
                                if let Err(e) = sweep.job.run(Utc::now()).await {
                                    tracing::warn!(
                                        sweep = name,
                                        error = %e,
                                        "Sweep failed, will retry on next tick"
                                    );
                                }
                            }
                        }
                    }
                })
            })
            .collect()
    }

    pub fn shutdown(&self) {
        tracing::info!("Initiating sweep scheduler shutdown");
        self.shutdown_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSecret;
    use crate::services::InMemoryStore;
    use uuid::Uuid;

    fn config(enabled: bool) -> RetentionConfig {
        RetentionConfig {
            enabled,
            trash_sweep_interval_secs: 3600,
            auth_request_sweep_interval_secs: 3600,
        }
    }

    async fn old_trashed_secret(store: &InMemoryStore) {
        let secret = store
            .create_secret(
                Uuid::new_v4(),
                NewSecret {
                    key: "k".to_string(),
                    value: "v".to_string(),
                    note: String::new(),
                },
                None,
            )
            .await
            .unwrap();
        store
            .set_deleted_date(secret.id, Some(Utc::now() - chrono::Duration::days(60)))
            .await;
    }

    #[tokio::test]
    async fn run_all_triggers_both_sweepers() {
        let store = Arc::new(InMemoryStore::new());
        old_trashed_secret(&store).await;
        let scheduler = SweepScheduler::new(&config(true), store.clone());

        let results = scheduler.run_all(Utc::now()).await;
        let reports: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].target, "secret_trash");
        assert_eq!(reports[0].removed, 1);
        assert_eq!(reports[1].target, "expired_auth_requests");
        assert_eq!(reports[1].removed, 0);
        assert!(store.all_secrets().await.is_empty());
    }

    #[tokio::test]
    async fn disabled_scheduler_spawns_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = SweepScheduler::new(&config(false), store);
        assert!(scheduler.start().is_empty());
    }

    #[tokio::test]
    async fn started_scheduler_sweeps_and_stops_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        old_trashed_secret(&store).await;
        let scheduler = SweepScheduler::new(&config(true), store.clone());

        let handles = scheduler.start();
        assert_eq!(handles.len(), 2);

        for _ in 0..50 {
            if store.all_secrets().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.all_secrets().await.is_empty());

        scheduler.shutdown();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("sweep task did not stop")
                .expect("sweep task panicked");
        }
    }
}
