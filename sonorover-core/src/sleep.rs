use std::time::{Duration, Instant};

pub use spin_sleep::SpinSleeper;

/// A trait for sleep operations.
pub trait Sleep: std::fmt::Debug + Send {
    /// Sleep until the specified deadline.
    fn sleep_until(&self, deadline: Instant);

    /// Sleep for `duration`. Returns immediately for a zero duration.
    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.sleep_until(Instant::now() + duration);
    }
}

// GRCOV_EXCL_START
impl Sleep for Box<dyn Sleep> {
    fn sleep_until(&self, deadline: Instant) {
        self.as_ref().sleep_until(deadline);
    }
}
// GRCOV_EXCL_STOP

/// A sleeper that uses [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StdSleeper;

impl Sleep for StdSleeper {
    fn sleep_until(&self, deadline: Instant) {
        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }
}

impl Sleep for SpinSleeper {
    fn sleep_until(&self, deadline: Instant) {
        SpinSleeper::sleep(*self, deadline.saturating_duration_since(Instant::now()));
    }
}
