//! Time limits on collaborator calls.

use ontoclaw_llm::{LlmError, LlmResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run a collaborator call, turning an elapsed `limit` into [`LlmError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, what: &str, call: F) -> LlmResult<T>
where
    F: Future<Output = LlmResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            let ms = limit.as_millis() as u64;
            warn!(call = what, timeout_ms = ms, "Collaborator call timed out");
            Err(LlmError::Timeout(ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_results() {
        let r = with_timeout(Duration::from_secs(1), "ok", async { Ok::<_, LlmError>(7) }).await;
        assert_eq!(r.unwrap(), 7);
    }

    #[tokio::test]
    async fn elapsed_becomes_timeout_error() {
        let r: LlmResult<()> = with_timeout(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(r, Err(LlmError::Timeout(10))));
    }
}
