//! Rate-limit retry around the low-level `api_call` dispatch.
//!
//! Every endpoint routes through `api_call`, so wrapping that single entry
//! covers the whole surface. A `ratelimited` response is waited out for the
//! server's `Retry-After` and the identical request is sent again; every
//! other outcome goes back to the caller untouched.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::Transform;
use crate::client::API_CALL;
use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::method::{CallArgs, Method, MethodMap, method};
use crate::{Error, Result};

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Limits on retrying one call. Unlimited by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum attempts, including the first
    pub max_attempts: Option<u32>,
    /// Maximum total wait
    pub max_total_wait: Option<Duration>,
    /// Wait used when the response carries no `Retry-After`
    pub default_retry_after: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RetryBudget {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            max_total_wait: config.max_total_wait,
            default_retry_after: config.default_retry_after,
        }
    }
}

/// Outcome of one dispatch attempt
enum Classification {
    /// Rate limited: wait and send again
    RateLimited(ApiError),
    /// Anything else goes back to the caller
    Final(Result<serde_json::Value>),
}

fn classify(result: Result<serde_json::Value>) -> Classification {
    match result {
        Err(Error::Api(e)) if e.is_rate_limited() => Classification::RateLimited(e),
        other => Classification::Final(other),
    }
}

/// Retries rate-limited dispatches.
#[derive(Clone)]
pub struct RateLimitTransform {
    budget: RetryBudget,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitTransform {
    /// Transform with the given budget, sleeping on the calling thread
    #[must_use]
    pub fn new(budget: RetryBudget) -> Self {
        Self {
            budget,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the sleeper
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Create from config
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(RetryBudget::from(config))
    }

    /// Retry limits in force
    #[must_use]
    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }
}

impl Default for RateLimitTransform {
    fn default() -> Self {
        Self::new(RetryBudget::default())
    }
}

impl fmt::Debug for RateLimitTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitTransform")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl Transform for RateLimitTransform {
    fn apply(&self, mut methods: MethodMap) -> Result<MethodMap> {
        let Some(inner) = methods.remove(API_CALL) else {
            debug!("No {API_CALL} to wrap, skipping");
            return Ok(methods);
        };
        methods.insert(
            API_CALL,
            retrying(inner, self.budget.clone(), Arc::clone(&self.sleeper)),
        );
        Ok(methods)
    }
}

fn retrying(inner: Method, budget: RetryBudget, sleeper: Arc<dyn Sleeper>) -> Method {
    method(move |client, args: CallArgs| {
        let mut attempts = 0u32;
        let mut waited = Duration::ZERO;

        loop {
            attempts += 1;

            let error = match classify(inner(client, args.clone())) {
                Classification::Final(result) => return result,
                Classification::RateLimited(error) => error,
            };

            let delay = error.retry_after().unwrap_or(budget.default_retry_after);
            let attempts_spent = budget.max_attempts.is_some_and(|max| attempts >= max);
            let wait_spent = budget
                .max_total_wait
                .is_some_and(|max| waited.saturating_add(delay) > max);
            if attempts_spent || wait_spent {
                debug!(
                    api_method = %error.method,
                    attempts,
                    waited_ms = waited.as_millis(),
                    "Rate limit retry budget exhausted"
                );
                return Err(Error::RetryBudgetExhausted {
                    attempts,
                    waited,
                    source: error,
                });
            }

            warn!(
                api_method = %error.method,
                attempt = attempts,
                delay_secs = delay.as_secs_f64(),
                "Rate limited, retrying after delay"
            );
            sleeper.sleep(delay);
            waited = waited.saturating_add(delay);
        }
    })
}
