//! Concurrency limiter for page fetches
//!
//! A thin wrapper over a shared tokio semaphore. Permits are RAII guards, so
//! capacity comes back when a permit is dropped, whether the holder finished,
//! returned an error, panicked or was aborted.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors raised by the limiter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("Concurrency limit must be at least 1")]
    ZeroCapacity,

    #[error("Concurrency limit {0} exceeds the supported maximum")]
    TooLarge(usize),

    #[error("Limiter has been closed")]
    Closed,
}

/// Caps the number of simultaneously running fetches
///
/// Cloning is cheap and every clone shares the same capacity.
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Proof of admission; dropping it frees the slot
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl Limiter {
    /// Creates a limiter granting at most `max_concurrent` permits at once
    pub fn new(max_concurrent: usize) -> Result<Self, LimiterError> {
        if max_concurrent == 0 {
            return Err(LimiterError::ZeroCapacity);
        }
        if max_concurrent > Semaphore::MAX_PERMITS {
            return Err(LimiterError::TooLarge(max_concurrent));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            capacity: max_concurrent,
        })
    }

    /// Waits until a slot is free and takes it
    ///
    /// Waiters are admitted in FIFO order, so a waiting task always gets in
    /// once enough earlier holders release.
    pub async fn acquire(&self) -> Result<Permit, LimiterError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LimiterError::Closed)?;

        Ok(Permit { _permit: permit })
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
