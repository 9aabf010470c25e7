//! Backoff policy: decides how long a worker waits after a retriable failure.

use std::time::Duration;

/// Default clamp on a single backoff wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Geometric backoff: `unit * base^attempts`, clamped to `max_delay`.
///
/// Example with base=2, unit=1s:
/// - attempt 1 (first failure): 2s
/// - attempt 2: 4s
/// - attempt 3: 8s
/// - attempt 4: 16s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: u32,
    pub unit: Duration,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(base: u32, unit: Duration) -> Self {
        Self {
            base,
            unit,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before the worker that recorded failure number `attempts` polls again.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        compute_delay(self.base, attempts, self.unit, self.max_delay)
    }
}

impl Default for BackoffPolicy {
    /// base=2, 1 second units.
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

/// `unit * base^attempts`, clamped to `max_delay`. Pure; overflow clamps too.
pub fn compute_delay(base: u32, attempts: u32, unit: Duration, max_delay: Duration) -> Duration {
    let factor = base.checked_pow(attempts).unwrap_or(u32::MAX);
    unit.checked_mul(factor).map_or(max_delay, |delay| delay.min(max_delay))
}
