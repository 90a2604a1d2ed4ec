//! Remaining wall-clock allowance for network activity during a single chain build

use core::time::Duration;
use std::time::Instant;

/// [`TimeBudget`] is threaded by mutable reference through every operation that may touch the
/// network. Once it reaches zero no further downloads are attempted for the remainder of the build.
///
/// A budget is not shared across builds. Each call to [`build_chain`](crate::build_chain) should
/// receive its own instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeBudget {
    remaining: Duration,
}

impl TimeBudget {
    /// Creates a budget with the given allowance
    pub fn new(remaining: Duration) -> Self {
        TimeBudget { remaining }
    }

    /// A budget that permits no network activity
    pub fn exhausted() -> Self {
        TimeBudget {
            remaining: Duration::ZERO,
        }
    }

    /// Allowance left
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// True when no allowance is left
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Deducts `elapsed`, saturating at zero
    pub fn consume(&mut self, elapsed: Duration) {
        self.remaining = self.remaining.saturating_sub(elapsed);
    }

    /// `run_timed` executes `f` and charges its wall-clock duration against the budget.
    pub fn run_timed<T, F: FnOnce(Duration) -> T>(&mut self, f: F) -> T {
        let start = Instant::now();
        let retval = f(self.remaining);
        self.consume(start.elapsed());
        retval
    }
}

impl Default for TimeBudget {
    fn default() -> Self {
        TimeBudget::new(Duration::from_secs(15))
    }
}

#[test]
fn time_budget_test() {
    let mut tb = TimeBudget::new(Duration::from_millis(10));
    assert!(!tb.is_exhausted());
    tb.consume(Duration::from_millis(4));
    assert_eq!(tb.remaining(), Duration::from_millis(6));
    tb.consume(Duration::from_secs(1));
    assert!(tb.is_exhausted());
    assert_eq!(tb.remaining(), Duration::ZERO);

    let mut tb = TimeBudget::new(Duration::from_secs(60));
    let seen = tb.run_timed(|allowance| allowance);
    assert_eq!(seen, Duration::from_secs(60));
    assert!(tb.remaining() <= Duration::from_secs(60));

    assert!(TimeBudget::exhausted().is_exhausted());
}
