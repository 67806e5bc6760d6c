//! Saved-network refresh cycle.
//!
//! The device answers a list request with one network-information report per
//! stored profile and never says when it is done. A cycle therefore settles
//! after a quiet period with no reports. Reports that arrive after the cycle
//! settled belong to no request and are dropped.
//!
//! Time is passed in by the caller so the policy stays deterministic.

use std::time::{Duration, Instant};

/// Phase of the current refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// No refresh requested yet.
    Idle,
    /// Accumulating reports.
    Collecting,
    /// Quiet period elapsed; the saved list is complete.
    Settled,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Collecting { last_activity: Instant },
    Settled,
}

/// Completion tracking for saved-network refreshes.
#[derive(Debug, Clone)]
pub struct RefreshCycle {
    state: State,
    quiet_period: Duration,
    generation: u64,
}

impl RefreshCycle {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            state: State::Idle,
            quiet_period,
            generation: 0,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        match self.state {
            State::Idle => RefreshPhase::Idle,
            State::Collecting { .. } => RefreshPhase::Collecting,
            State::Settled => RefreshPhase::Settled,
        }
    }

    /// Number of refreshes started, including superseded ones.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Start a new cycle, superseding any cycle in progress.
    pub fn start(&mut self, now: Instant) {
        self.generation += 1;
        self.state = State::Collecting { last_activity: now };
    }

    /// Record a station report. Returns `false` if it must be dropped.
    ///
    /// A report while idle opens an unsolicited cycle.
    pub fn accept_report(&mut self, now: Instant) -> bool {
        match self.state {
            State::Settled => false,
            State::Idle | State::Collecting { .. } => {
                self.state = State::Collecting { last_activity: now };
                true
            }
        }
    }

    /// Settle the cycle if the quiet period has elapsed.
    ///
    /// Returns `true` exactly once per cycle, on the call that settles it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            State::Collecting { last_activity }
                if now.saturating_duration_since(last_activity) >= self.quiet_period =>
            {
                self.state = State::Settled;
                true
            }
            _ => false,
        }
    }
}
