//! Poll timer state machine.
//!
//! `Poller` owns the only timer in the client. It moves between `Idle` and `Polling`
//! through guarded transitions, so a second start replaces the timer instead of
//! stacking a duplicate, and a stop while idle does nothing.

use crate::model::{ExamStatus, SessionSummary, StopReason};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Live poll timer. Dropping it cancels all future ticks.
pub(crate) struct PollHandle {
    ticker: Interval,
    generation: u64,
}

pub(crate) enum PollState {
    Idle,
    Polling(PollHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartOutcome {
    Started,
    /// A timer was already running and has been replaced by a fresh one.
    Replaced,
}

pub(crate) struct Poller {
    period: Duration,
    state: PollState,
    next_generation: u64,
    // Generation of the poll request currently on the wire, if any.
    outstanding: Option<u64>,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: PollState::Idle,
            next_generation: 0,
            outstanding: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, PollState::Polling(_))
    }

    fn current_generation(&self) -> Option<u64> {
        match &self.state {
            PollState::Polling(h) => Some(h.generation),
            PollState::Idle => None,
        }
    }

    pub fn start(&mut self) -> StartOutcome {
        let outcome = if self.is_polling() {
            StartOutcome::Replaced
        } else {
            StartOutcome::Started
        };

        // First tick fires one period after start, not immediately.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.next_generation += 1;
        self.state = PollState::Polling(PollHandle {
            ticker,
            generation: self.next_generation,
        });
        outcome
    }

    /// Returns whether a timer was actually running.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, PollState::Idle) {
            PollState::Polling(_) => true,
            PollState::Idle => false,
        }
    }

    /// Wait for the next tick. Never resolves while idle.
    pub async fn tick(&mut self) -> u64 {
        match &mut self.state {
            PollState::Polling(handle) => {
                handle.ticker.tick().await;
                handle.generation
            }
            PollState::Idle => std::future::pending().await,
        }
    }

    /// Claim the slot for a poll request of `generation`. Fails if that generation is
    /// stale or already has a request in flight.
    pub fn begin_poll(&mut self, generation: u64) -> bool {
        if self.current_generation() != Some(generation) || self.outstanding == Some(generation) {
            return false;
        }
        self.outstanding = Some(generation);
        true
    }

    /// Release the in-flight slot and report whether the result should be applied.
    pub fn finish_poll(&mut self, generation: u64) -> bool {
        if self.outstanding == Some(generation) {
            self.outstanding = None;
        }
        self.accepts(generation)
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.current_generation() == Some(generation)
    }
}

/// Accumulates what a single polling session observed.
pub(crate) struct SessionTracker {
    base_url: String,
    poll_interval: Duration,
    started_utc: String,
    polls_ok: u64,
    polls_failed: u64,
    peak_noise_level: Option<f64>,
    windows_seen: Vec<String>,
    last_status: Option<ExamStatus>,
}

impl SessionTracker {
    pub fn begin(base_url: &str, poll_interval: Duration) -> Self {
        Self {
            base_url: base_url.to_string(),
            poll_interval,
            started_utc: now_rfc3339(),
            polls_ok: 0,
            polls_failed: 0,
            peak_noise_level: None,
            windows_seen: Vec::new(),
            last_status: None,
        }
    }

    pub fn record_status(&mut self, status: &ExamStatus) {
        self.polls_ok += 1;
        self.peak_noise_level = Some(match self.peak_noise_level {
            Some(peak) => peak.max(status.noise_level),
            None => status.noise_level,
        });
        if !status.current_window.is_empty() && !self.windows_seen.contains(&status.current_window)
        {
            self.windows_seen.push(status.current_window.clone());
        }
        self.last_status = Some(status.clone());
    }

    pub fn record_failure(&mut self) {
        self.polls_failed += 1;
    }

    pub fn finish(self, reason: StopReason) -> SessionSummary {
        SessionSummary {
            base_url: self.base_url,
            started_utc: self.started_utc,
            ended_utc: now_rfc3339(),
            reason,
            poll_interval: self.poll_interval,
            polls_ok: self.polls_ok,
            polls_failed: self.polls_failed,
            peak_noise_level: self.peak_noise_level,
            windows_seen: self.windows_seen,
            last_status: self.last_status,
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}
