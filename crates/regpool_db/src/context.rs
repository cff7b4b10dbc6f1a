//! Per-call context threaded through every gateway call.
//!
//! The registration pool never retries and never imposes its own timeout; the
//! caller decides how long a whole classification may take and every store
//! round-trip inside it shares that budget.

use crate::error::StoreError;
use regpool_config::StoreConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline carried by a single logical request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context without deadline.
    pub fn background() -> Self {
        Self { deadline: None }
    }

    /// A context that expires `timeout` from now.
    ///
    /// A timeout too large to be represented as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or_else(Self::background, Self::with_deadline)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Builds a context from an optional millisecond budget, as found in `StoreConfig`.
    pub fn from_timeout_ms(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => Self::with_timeout(Duration::from_millis(ms)),
            None => Self::background(),
        }
    }

    /// A context for one request under the configured `request_timeout_ms`.
    pub fn for_store(config: &StoreConfig) -> Self {
        Self::from_timeout_ms(config.request_timeout_ms)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Fails with `DeadlineExceeded` once the deadline has passed.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_expired() {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs a store future, abandoning it when the deadline passes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match self.deadline {
            None => fut.await,
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| StoreError::DeadlineExceeded)?,
        }
    }
}
