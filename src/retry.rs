//! Bounded async retry with linear backoff.
//!
//! Used by outbound collaborator calls (interbank gateway). Ledger CAS
//! conflicts are deliberately NOT routed through this helper: the store
//! surfaces them to the caller, which must re-read before retrying.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    pub attempts: u32,
    pub backoff: Duration,
}

/// Run `op` up to `attempts` times, sleeping `backoff * attempt` between
/// tries. Returns the last error when every attempt fails.
pub async fn retry<T, E, F, Fut>(options: RetryOptions, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = options.attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(options.backoff * attempt).await;
                }
            }
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = retry(
            RetryOptions {
                attempts: 3,
                backoff: Duration::from_millis(1),
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, &str> = retry(
            RetryOptions {
                attempts: 3,
                backoff: Duration::from_millis(1),
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok(7) } }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry(
            RetryOptions {
                attempts: 3,
                backoff: Duration::from_millis(1),
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {}", n)) }
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
