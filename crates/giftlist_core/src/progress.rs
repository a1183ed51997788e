use std::time::Duration;

/// Elapsed-time keyed loading messages for the fetch spinner.
///
/// Purely cosmetic: the displayed phase is a function of how long the user
/// has been waiting, not of real job status. Job status lives in the
/// engine's state machine and must not be inferred from this.
#[derive(Debug, Clone)]
pub struct PhaseMessages {
    phases: Vec<(Duration, String)>,
}

impl Default for PhaseMessages {
    fn default() -> Self {
        Self::new([
            (Duration::ZERO, "Contacting store page..."),
            (Duration::from_secs(3), "Reading item details..."),
            (Duration::from_secs(8), "Looking for pictures and prices..."),
            (Duration::from_secs(15), "Almost there..."),
        ])
    }
}

impl PhaseMessages {
    /// Builds a message table from `(threshold, message)` pairs. Pairs are
    /// sorted by threshold so callers may pass them in any order.
    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (Duration, S)>) -> Self {
        let mut phases: Vec<(Duration, String)> = pairs
            .into_iter()
            .map(|(at, msg)| (at, msg.into()))
            .collect();
        phases.sort_by_key(|(at, _)| *at);
        Self { phases }
    }

    /// The message for the given elapsed wait, or `None` before the first
    /// threshold.
    pub fn message_at(&self, elapsed: Duration) -> Option<&str> {
        self.phases
            .iter()
            .rev()
            .find(|(at, _)| elapsed >= *at)
            .map(|(_, msg)| msg.as_str())
    }
}

/// Asymptotic fake completion percentage for a progress ring.
///
/// Grows as `t / (t + tau)` so it approaches but never reaches 100. Not an
/// estimate of real job progress.
pub fn cosmetic_percent(elapsed: Duration, tau: Duration) -> f64 {
    let t = elapsed.as_secs_f64();
    let denom = t + tau.as_secs_f64();
    if denom == 0.0 {
        return 0.0;
    }
    100.0 * t / denom
}
