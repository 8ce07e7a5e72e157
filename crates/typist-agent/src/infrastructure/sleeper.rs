//! `Sleeper` implementations.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::Sleeper;

/// Suspends the current task on the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately and records every requested duration.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every recorded sleep.
    pub fn total(&self) -> Duration {
        self.sleeps
            .lock()
            .map(|s| s.iter().sum())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}
