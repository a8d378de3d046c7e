//! Cooldown that keeps continuous background noise from pausing playback over
//! and over.

use std::time::{Duration, Instant};

pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(2000);

/// Once armed, local speech-starts are dropped until the window elapses.
///
/// Only a monotonic clock read is needed; nothing is scheduled.
#[derive(Debug, Clone)]
pub struct SuppressionTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl SuppressionTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }
}

impl Default for SuppressionTimer {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}
