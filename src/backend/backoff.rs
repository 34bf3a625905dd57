//! Transport-level retry with exponential backoff and jitter.
//!
//! Applies only to faults of the wire. A reply that arrives but fails
//! schema validation is never retried here; that is the retry
//! controller's correction cycle.

use std::time::Duration;

/// Configuration for transport-level retry with exponential backoff and jitter.
///
/// # Example
///
/// ```
/// use extraction_agent::backend::BackoffConfig;
///
/// let none = BackoffConfig::none();
/// assert_eq!(none.max_retries, 0);
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Maximum number of transport retries after the first call.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,

    /// Upper bound on any single delay, including `Retry-After` hints.
    pub max_delay: Duration,

    /// Jitter strategy.
    pub jitter: JitterStrategy,

    /// HTTP status codes that trigger retry.
    pub retryable_statuses: Vec<u16>,

    /// Whether to honour `Retry-After` headers from the provider.
    pub respect_retry_after: bool,
}

/// Jitter strategy to spread out concurrent retries against a shared rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Delay is exactly the calculated value.
    None,

    /// Random value in `[0, calculated_delay]`.
    Full,

    /// `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// No transport retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// Cloud API defaults: 3 retries, 1s initial, 2x multiplier, 60s max,
    /// full jitter, honours Retry-After.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Delay before retry N (0-indexed): `initial_delay * multiplier^N`,
    /// capped at `max_delay`, then jittered.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}
