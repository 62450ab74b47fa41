//! Bounded-retry bootstrap for external dependencies.
//!
//! Every process that needs a broker or a database calls [`bootstrap`] once at
//! startup. The attempt counter lives inside the call; two bootstraps never
//! share state.

use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{CourierError, Result};

/// How long to wait after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// `unit * attempt²` after the attempt-th failure
    Quadratic(Duration),
}

/// Delay strategy plus the number of failures tolerated before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    pub max_failures: u32,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration, max_failures: u32) -> Self {
        Self {
            backoff: Backoff::Fixed(delay),
            max_failures,
        }
    }

    pub fn quadratic(unit: Duration, max_failures: u32) -> Self {
        Self {
            backoff: Backoff::Quadratic(unit),
            max_failures,
        }
    }

    /// Relational store: 2s between attempts, gives up after 10 failures
    pub fn store_default() -> Self {
        Self::fixed(Duration::from_secs(2), 10)
    }

    /// Broker: attempt² seconds between attempts, gives up after 5 failures
    pub fn broker_default() -> Self {
        Self::quadratic(Duration::from_secs(1), 5)
    }

    /// Delay applied once `attempt` failures have been observed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Quadratic(unit) => unit.saturating_mul(attempt.saturating_mul(attempt)),
        }
    }

    /// Delays for attempts `0..=max_failures`, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..=self.max_failures).map(move |attempt| self.delay_for(attempt))
    }
}

/// Serialized form of a [`RetryPolicy`], as found in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub strategy: RetryStrategy,
    pub delay_ms: u64,
    pub max_failures: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    Fixed,
    Quadratic,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        let delay = Duration::from_millis(settings.delay_ms);
        match settings.strategy {
            RetryStrategy::Fixed => RetryPolicy::fixed(delay, settings.max_failures),
            RetryStrategy::Quadratic => RetryPolicy::quadratic(delay, settings.max_failures),
        }
    }
}

/// Run `connect` until it succeeds or the policy's failure cap is exceeded.
///
/// With `k` failures before the first success the call connects iff
/// `k <= policy.max_failures`; otherwise it returns [`CourierError::Bootstrap`]
/// after exactly `max_failures + 1` attempts.
pub async fn bootstrap<T, E, F, Fut>(
    dependency: &str,
    policy: &RetryPolicy,
    mut connect: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut failures: u32 = 0;

    loop {
        match connect().await {
            Ok(handle) => {
                info!(dependency, attempts = failures + 1, "connected");
                return Ok(handle);
            }
            Err(e) => {
                failures += 1;
                warn!(dependency, attempt = failures, error = %e, "{} not yet ready", dependency);

                if failures > policy.max_failures {
                    error!(dependency, attempts = failures, "giving up: {}", e);
                    return Err(CourierError::Bootstrap {
                        dependency: dependency.to_string(),
                        attempts: failures,
                        reason: e.to_string(),
                    });
                }

                let delay = policy.delay_for(failures);
                info!(dependency, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
