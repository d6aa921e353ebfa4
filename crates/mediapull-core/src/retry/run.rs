//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Runs `op` until it succeeds or the retry policy says to stop.
///
/// `op` receives the 1-based attempt number. After each failure `classify`
/// sees the error and the attempt that produced it (callers use this hook to
/// report progress); on a retryable failure the loop sleeps for the backoff
/// delay and tries again. The last error is returned when retries run out.
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    mut op: F,
    mut classify: C,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E, u32) -> ErrorKind,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e, attempt);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}
