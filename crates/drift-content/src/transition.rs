//! Transition phases
//!
//! Phase names, their durations and the staggered reveal schedule.

use std::fmt;
use std::time::Duration;

/// Lifecycle phase of the content region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Old content fading out while the target is prepared
    FadingOut,
    /// Teardown, replacement and rebinding
    Swapping,
    FadingIn,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::FadingOut => "fading-out",
            Phase::Swapping => "swapping",
            Phase::FadingIn => "fading-in",
        };
        f.write_str(name)
    }
}

/// Fixed phase durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub fade_out: Duration,
    pub fade_in: Duration,
    pub error_flash: Duration,
    pub search_error: Duration,
}

/// Stagger between consecutive element reveals
///
/// `step = clamp(budget / count, min_step, max_step)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPolicy {
    pub budget: Duration,
    pub min_step: Duration,
    pub max_step: Duration,
}

impl RevealPolicy {
    pub fn step(&self, count: usize) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        (self.budget / count).min(self.max_step).max(self.min_step)
    }

    /// Reveal delay of each of `count` elements
    pub fn delays(&self, count: usize) -> impl Iterator<Item = Duration> {
        let step = self.step(count);
        (0..count).map(move |i| step.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
    }
}
