//! Elapsed-time counter for an active call
//!
//! The counter is advanced by an external tick source (one second per tick in
//! the driver, arbitrary amounts in tests). Crossing the check-in threshold
//! raises a single advisory per counter, even when several ticks are coalesced
//! into one advance.

/// Seconds after which the agent is reminded to check in with the customer
pub const DEFAULT_CHECK_IN_AFTER_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    Stopped,
    Running,
}

/// One-time notice that a call has run past the check-in threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInAdvisory {
    pub elapsed_seconds: u64,
    pub threshold_seconds: u64,
}

/// Per-session elapsed-time state machine
#[derive(Debug, Clone)]
pub struct ElapsedCounter {
    state: CounterState,
    elapsed: u64,
    threshold: u64,
    advisory_fired: bool,
}

impl Default for ElapsedCounter {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_IN_AFTER_SECS)
    }
}

impl ElapsedCounter {
    /// Create a stopped counter with the given check-in threshold in seconds
    pub fn new(threshold: u64) -> Self {
        Self {
            state: CounterState::Stopped,
            elapsed: 0,
            threshold,
            advisory_fired: false,
        }
    }

    /// Start counting from zero. Starting a running counter has no effect.
    pub fn start(&mut self) {
        if self.state == CounterState::Running {
            return;
        }
        self.state = CounterState::Running;
        self.elapsed = 0;
    }

    /// Advance by `seconds`; returns the advisory on the advance that crosses the threshold
    pub fn advance(&mut self, seconds: u64) -> Option<CheckInAdvisory> {
        if self.state != CounterState::Running || seconds == 0 {
            return None;
        }

        self.elapsed = self.elapsed.saturating_add(seconds);

        if !self.advisory_fired && self.elapsed >= self.threshold {
            self.advisory_fired = true;
            return Some(CheckInAdvisory {
                elapsed_seconds: self.elapsed,
                threshold_seconds: self.threshold,
            });
        }

        None
    }

    /// Advance by one second
    pub fn tick(&mut self) -> Option<CheckInAdvisory> {
        self.advance(1)
    }

    /// Stop counting and return the final elapsed value
    pub fn stop(&mut self) -> u64 {
        self.state = CounterState::Stopped;
        self.elapsed
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn state(&self) -> CounterState {
        self.state
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Whether the check-in advisory has already been raised
    pub fn advisory_fired(&self) -> bool {
        self.advisory_fired
    }
}
