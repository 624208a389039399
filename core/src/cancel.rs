//! Cooperative cancellation for async operations.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

use crate::error::HttpError;

/// Await `operation` unless `token` is cancelled first.
///
/// Cancellation only stops the wait; the server may still have processed the
/// request.
pub async fn with_cancellation<F, T>(token: &CancellationToken, operation: F) -> Result<T, HttpError>
where
    F: Future<Output = Result<T, HttpError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!("http operation cancelled");
            Err(HttpError::Cancelled)
        }
        result = operation => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let result = with_cancellation(&token, async { Ok::<_, HttpError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result = with_cancellation(&token, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, HttpError>(())
        })
        .await;
        assert!(matches!(result, Err(HttpError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_during_wait() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });
        let result = with_cancellation(&token, std::future::pending::<Result<(), HttpError>>()).await;
        assert!(matches!(result, Err(HttpError::Cancelled)));
    }
}
