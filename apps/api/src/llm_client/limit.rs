//! Process-wide cap on in-flight completion calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{CompletionBackend, CompletionRequest, LlmError};

/// Wraps a backend so that at most `limit` calls run at once, whichever
/// stage issues them. Callers over the limit wait for a permit.
pub struct LimitedBackend {
    inner: Arc<dyn CompletionBackend>,
    permits: Arc<Semaphore>,
}

impl LimitedBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>, limit: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }
}

#[async_trait]
impl CompletionBackend for LimitedBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::LimiterClosed)?;
        debug!(
            "LLM permit acquired, {} left",
            self.permits.available_permits()
        );
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::future::join_all;

    use crate::pipeline::testing::SlowBackend;

    fn request() -> CompletionRequest<'static> {
        CompletionRequest {
            system: "sys",
            prompt: "hello",
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_calls_beyond_limit_wait_for_a_permit() {
        let slow = Arc::new(SlowBackend::new("[]", Duration::from_millis(20)));
        let limited = LimitedBackend::new(slow.clone(), 2);

        let results = join_all((0..6).map(|_| limited.complete(request()))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(slow.calls(), 6);
        assert_eq!(slow.peak(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_still_admits_one_call() {
        let slow = Arc::new(SlowBackend::new("[]", Duration::from_millis(1)));
        let limited = LimitedBackend::new(slow.clone(), 0);

        assert!(limited.complete(request()).await.is_ok());
        assert_eq!(slow.peak(), 1);
    }
}
