//! Delay capability used between turns.

use std::time::Duration;

use async_trait::async_trait;

/// Waits out the pacing delay between turns.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real-time delay on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Skips the delay entirely. Keeps runs deterministic in tests and batch use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediatePacer;

#[async_trait]
impl Pacer for ImmediatePacer {
    async fn wait(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
