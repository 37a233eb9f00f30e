//! Background retention jobs.

mod scheduler;
mod sweeper;

pub use scheduler::{ScheduledSweep, SweepScheduler};
pub use sweeper::{
    ExpiredAuthRequests, RetentionSweeper, RetentionTarget, RetentionWindow, SecretTrash,
    SweepJob, SweepReport, AUTH_REQUEST_EXPIRATION_MINUTES, SECRET_TRASH_RETENTION_DAYS,
};
