use async_trait::async_trait;
use std::time::Duration;

/// Suspension point between attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    #[tracing::instrument(skip(self))]
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_timer_waits() {
        let start = std::time::Instant::now();
        TokioTimer.sleep(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
