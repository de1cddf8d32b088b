//! Error types for the scheduled jobs.
//!
//! The pure engine has no error type: classification of a missing-input date
//! is itself a valid state, so fetch failures degrade to empty windows
//! upstream. Errors here belong to the I/O shell — schedule configuration,
//! the store, and payload delivery.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::db::DbError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] crate::notification::DeliveryError),
}

impl JobError {
    /// Delivery failures are transient; configuration and store errors need
    /// intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Delivery(_))
    }
}
