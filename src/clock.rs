//! Timestamps for slot ageing and receive budgets.
//!
//! A host that implements [`FrameLink::now_ms`] gets wall-clock behaviour.
//! Without it, the receiver counts its own empty reads and every duration in
//! [`PoolConfig`] is converted into an attempt count by dividing by the poll
//! interval.

use crate::{config::PoolConfig, host::FrameLink};

/// Point in time as seen by the receiver. Both variants wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Host milliseconds.
    Millis(u32),
    /// Receiver attempt counter.
    Attempt(u32),
}

impl Tick {
    /// Elapsed units since `earlier`, or `None` when the two ticks come from
    /// different sources.
    #[must_use]
    pub fn since(self, earlier: Tick) -> Option<u32> {
        match (self, earlier) {
            (Tick::Millis(now), Tick::Millis(then)) | (Tick::Attempt(now), Tick::Attempt(then)) => {
                Some(now.wrapping_sub(then))
            }
            _ => None,
        }
    }

    /// Whether `self` lies strictly before `other`. Gaps wider than half the
    /// counter range are read as wraparound.
    #[must_use]
    pub fn is_before(self, other: Tick) -> bool {
        other
            .since(self)
            .is_some_and(|gap| gap != 0 && gap <= u32::MAX / 2)
    }
}

/// Attempt counter plus access to the host tick.
#[derive(Debug, Default)]
pub struct Clock {
    attempts: u32,
}

impl Clock {
    /// Sample the current tick.
    pub fn now<L: FrameLink + ?Sized>(&self, link: &mut L) -> Tick {
        link.now_ms()
            .map_or(Tick::Attempt(self.attempts), Tick::Millis)
    }

    /// Record one empty read.
    pub fn advance(&mut self) { self.attempts = self.attempts.wrapping_add(1); }
}

/// A duration expressed in both tick units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutWindow {
    millis: u32,
    attempts: u32,
}

impl TimeoutWindow {
    /// Window equal to the configured receive timeout.
    #[must_use]
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.receive_timeout_ms(), config.poll_interval_ms())
    }

    /// Window of `millis`, worth `millis / poll_interval_ms` attempts and at
    /// least one.
    #[must_use]
    pub fn new(millis: u32, poll_interval_ms: u32) -> Self {
        let attempts = millis.checked_div(poll_interval_ms).unwrap_or(millis).max(1);
        Self { millis, attempts }
    }

    /// Length of the window in milliseconds.
    #[must_use]
    pub const fn millis(&self) -> u32 { self.millis }

    /// Length of the window in attempts.
    #[must_use]
    pub const fn attempts(&self) -> u32 { self.attempts }

    /// Whether `start` lies at least one window before `now`. Ticks from
    /// mismatched sources count as elapsed.
    #[must_use]
    pub fn has_elapsed(&self, start: Tick, now: Tick) -> bool {
        let limit = match now {
            Tick::Millis(_) => self.millis,
            Tick::Attempt(_) => self.attempts,
        };
        now.since(start).is_none_or(|elapsed| elapsed >= limit)
    }
}

/// Spending limit for one blocking receive.
///
/// With a host clock the budget is wall time. Without one it is a number of
/// fruitless receive attempts, each charged through [`Budget::charge`].
#[derive(Debug)]
pub struct Budget {
    window: TimeoutWindow,
    start: Tick,
    charged: u32,
}

impl Budget {
    /// Open a budget of `window` starting at `start`.
    #[must_use]
    pub const fn new(window: TimeoutWindow, start: Tick) -> Self {
        Self {
            window,
            start,
            charged: 0,
        }
    }

    /// Count one fruitless attempt.
    pub fn charge(&mut self) { self.charged = self.charged.saturating_add(1); }

    /// Whether the budget is used up at `now`.
    #[must_use]
    pub fn is_spent(&self, now: Tick) -> bool {
        match now {
            Tick::Millis(_) => self.window.has_elapsed(self.start, now),
            Tick::Attempt(_) => self.charged >= self.window.attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Budget, Tick, TimeoutWindow};

    #[test]
    fn ticks_wrap_around() {
        assert_eq!(Tick::Millis(5).since(Tick::Millis(u32::MAX - 4)), Some(10));
        assert_eq!(Tick::Attempt(3).since(Tick::Millis(1)), None);
        assert!(Tick::Millis(u32::MAX).is_before(Tick::Millis(2)));
        assert!(!Tick::Millis(2).is_before(Tick::Millis(2)));
    }

    #[rstest]
    #[case(1000, 10, 100)]
    #[case(5, 10, 1)]
    #[case(0, 10, 1)]
    fn window_converts_timeout_to_attempts(
        #[case] millis: u32,
        #[case] poll: u32,
        #[case] attempts: u32,
    ) {
        assert_eq!(TimeoutWindow::new(millis, poll).attempts(), attempts);
    }

    #[test]
    fn window_elapses_at_its_length() {
        let window = TimeoutWindow::new(100, 10);
        assert!(!window.has_elapsed(Tick::Millis(0), Tick::Millis(99)));
        assert!(window.has_elapsed(Tick::Millis(0), Tick::Millis(100)));
        assert!(!window.has_elapsed(Tick::Attempt(0), Tick::Attempt(9)));
        assert!(window.has_elapsed(Tick::Attempt(0), Tick::Attempt(10)));
        assert!(window.has_elapsed(Tick::Attempt(0), Tick::Millis(0)));
    }

    #[test]
    fn attempt_budget_counts_charges_only() {
        let mut budget = Budget::new(TimeoutWindow::new(30, 10), Tick::Attempt(0));
        assert!(!budget.is_spent(Tick::Attempt(1_000)));
        budget.charge();
        budget.charge();
        assert!(!budget.is_spent(Tick::Attempt(2)));
        budget.charge();
        assert!(budget.is_spent(Tick::Attempt(3)));
    }

    #[test]
    fn wall_clock_budget_ignores_charges() {
        let mut budget = Budget::new(TimeoutWindow::new(30, 10), Tick::Millis(100));
        for _ in 0..10 {
            budget.charge();
        }
        assert!(!budget.is_spent(Tick::Millis(129)));
        assert!(budget.is_spent(Tick::Millis(130)));
    }
}
