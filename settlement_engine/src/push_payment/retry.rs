use std::{future::Future, time::Duration};

use log::*;

use crate::stl_api::errors::SettlementError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Bounded exponential backoff for calls to the push network. Only transient failures
/// ([`SettlementError::is_transient`]) are retried; business rejections are returned after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, base_delay: DEFAULT_BASE_DELAY }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// The pause before retry number `retry` (zero-based): `base`, `2 * base`, `4 * base`, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Every pause the policy would take if all attempts failed.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1)).map(|r| self.delay_for(r)).collect()
    }

    pub async fn run<T, F, Fut>(&self, desc: &str, mut op: F) -> Result<T, SettlementError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SettlementError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!("🔁️ {desc} failed on attempt {attempt}/{}. Retrying in {delay:?}. {e}", self.max_attempts);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    if e.is_transient() {
                        error!("🔁️ {desc} failed after {attempt} attempts. {e}");
                    }
                    return Err(e);
                },
            }
        }
    }
}
