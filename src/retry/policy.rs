//! Exponential backoff configuration and delay computation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retries made when the caller does not say otherwise. Roughly 15 minutes
/// of waiting once the delay reaches its ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 20;

pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(60_000);
pub const DEFAULT_FACTOR: f64 = 2.0;

/// How many times to retry and how long to wait in between.
///
/// The delay before attempt `n + 1` is
/// `min_delay * factor^(n - 1) * jitter`, where `jitter` is drawn uniformly
/// from `[1 - randomization_factor, 1 + randomization_factor]`, and the
/// result is kept within `[min_delay, max_delay]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub randomization_factor: f64,
    #[serde(rename = "min_delay_ms", with = "millis")]
    pub min_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            factor: DEFAULT_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Default backoff with the given retry budget; `None` means the default.
    pub fn with_max_retries(max_retries: Option<u32>) -> Self {
        Self {
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            ..Self::default()
        }
    }

    /// Total attempts allowed, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Inclusive bounds of the jitter multiplier.
    pub fn jitter_range(&self) -> (f64, f64) {
        let spread = self.randomization_factor.max(0.0);
        ((1.0 - spread).max(0.0), 1.0 + spread)
    }

    /// Delay after attempt `attempt` for a given jitter multiplier.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let min_ms = self.min_delay.as_secs_f64() * 1000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1000.0;
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;

        let raw = min_ms * self.factor.powi(exponent) * jitter;
        // NaN falls through to the floor; an infinite product to the ceiling.
        let ms = if raw.is_nan() { min_ms } else { raw.max(min_ms).min(max_ms) };
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }

    /// Delay after attempt `attempt`, with jitter drawn from `rng`.
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let (low, high) = self.jitter_range();
        let jitter = if high > low {
            rng.gen_range(low..=high)
        } else {
            low
        };
        self.delay_with_jitter(attempt, jitter)
    }

    /// Delay after attempt `attempt`, with jitter from the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_for(attempt, &mut rand::thread_rng())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
