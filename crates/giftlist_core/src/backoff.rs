use std::time::Duration;

/// Linear backoff schedule for poll/retry loops.
///
/// The delay for a given attempt is `base + attempt * step`, clamped to
/// `cap`. The schedule itself is stateless; callers pass the attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    pub base: Duration,
    pub step: Duration,
    pub cap: Duration,
    /// Hard ceiling on poll attempts before the caller gives up locally.
    pub max_attempts: u32,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            step: Duration::from_millis(250),
            cap: Duration::from_secs(3),
            max_attempts: 40,
        }
    }
}

impl BackoffSchedule {
    /// Delay before the given zero-based attempt. Pure and total;
    /// arithmetic saturates rather than overflowing.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base
            .saturating_add(self.step.saturating_mul(attempt))
            .min(self.cap)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
