//! Per-call deadlines for external services.

use keepsake_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Run `call` and fail with `AppError::Timeout` if it does not finish within `after`.
///
/// A timeout is reported like any other failure of the wrapped call, so each
/// caller applies its own degradation rule to both.
pub async fn with_deadline<T, F>(operation: &'static str, after: Duration, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_secs = after.as_secs_f64(), "External call timed out");
            Err(AppError::Timeout { operation, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_deadline("fast", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_times_out() {
        let result: AppResult<()> = with_deadline("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::Timeout {
                operation: "slow",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: AppResult<()> = with_deadline("failing", Duration::from_secs(1), async {
            Err(AppError::Store("disk on fire".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
