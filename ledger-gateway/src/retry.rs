// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::time::Duration;

use log::debug;
use rand::Rng;
use tokio::time::sleep;

/// Jittered exponential backoff for transaction submission.
///
/// The policy itself is error-agnostic: callers pass a retryability
/// predicate, so a revert surfaces immediately while a dropped connection is
/// resubmitted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        base_delay: Duration,
        max_delay: Duration,
        jitter_pct: f64,
    ) -> Self {
        let base_delay = base_delay.max(Duration::from_millis(1));
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter_pct: jitter_pct.clamp(0.0, 1.0),
        }
    }

    /// One-shot policy: the first failure is final.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::from_millis(1), Duration::from_millis(1), 0.0)
    }

    /// Defaults tuned for transaction submission over flaky RPC endpoints.
    pub fn default_submission() -> Self {
        Self::new(3, Duration::from_millis(200), Duration::from_secs(2), 0.2)
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 2_u32.saturating_pow(attempt as u32);
        let mut delay = self
            .base_delay
            .saturating_mul(factor)
            .min(self.max_delay);
        if self.jitter_pct > 0.0 {
            let spread = (delay.as_millis() as f64 * self.jitter_pct) as i64;
            if spread > 0 {
                let delta = rand::thread_rng().gen_range(-spread..=spread);
                let millis = (delay.as_millis() as i64).saturating_add(delta).max(0);
                delay = Duration::from_millis(millis as u64);
            }
        }
        delay
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted. `op` receives the zero-based attempt
    /// number.
    pub async fn run<F, Fut, T, E>(&self, retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.backoff(attempt - 1);
                    debug!("ledger call retrying in {delay:?} (attempt {attempt})");
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_submission()
    }
}
