use std::future::Future;
use std::time::Duration;

use super::SyncError;

/// Number of attempts a discovery run gets before it is abandoned
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry of a fallible async operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `attempt` until it succeeds or the attempt bound is reached
    ///
    /// `attempt` receives the 1-based attempt number. Every failure is logged;
    /// the last one is returned inside [`SyncError::Abandoned`].
    pub async fn run<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T, SyncError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut n = 1;
        loop {
            match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(e) if n >= max_attempts => {
                    tracing::error!(attempt = n, max_attempts, "{} failed, giving up: {}", what, e);
                    return Err(SyncError::Abandoned {
                        attempts: n,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt = n, max_attempts, "{} failed, retrying: {}", what, e);
                }
            }

            if !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }
            n += 1;
        }
    }
}
