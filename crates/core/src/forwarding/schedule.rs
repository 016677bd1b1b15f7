//! Window scheduling state for daemon mode
//!
//! The daemon loop itself lives in the infrastructure crate; this module owns
//! the pure parts: the state machine labels, the overlapping window
//! computation and the tick cadence.

use std::fmt;
use std::time::Duration;

use auditbridge_domain::{ForwarderError, Result, RunResult, TimeWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Daemon lifecycle: `Idle → Fetching → Delivering → Sleeping → Fetching …`,
/// ending in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Fetching,
    Delivering,
    Sleeping,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Delivering => "delivering",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Computes consecutive overlapping windows.
///
/// `last_end` is the end of the last window whose fetch succeeded. The next
/// window starts `overlap` before it so records that became visible late at
/// the source are re-read; the sink deduplicates them by identity.
///
/// Until a first fetch succeeds, the start of the first window is pinned so
/// a failing source never shifts the lookback range forward.
#[derive(Debug, Clone)]
pub struct WindowSchedule {
    overlap: chrono::Duration,
    lookback: chrono::Duration,
    last_end: Option<DateTime<Utc>>,
    pending_start: Option<DateTime<Utc>>,
}

impl WindowSchedule {
    /// # Errors
    /// Returns `ForwarderError::Configuration` when a duration is out of range
    /// or the lookback is zero.
    pub fn new(overlap: Duration, lookback: Duration) -> Result<Self> {
        if lookback.is_zero() {
            return Err(ForwarderError::Configuration("lookback must be greater than 0".into()));
        }
        Ok(Self { overlap: to_chrono(overlap, "overlap")?, lookback: to_chrono(lookback, "lookback")?, last_end: None, pending_start: None })
    }

    /// Resume from a known previous window end.
    #[must_use]
    pub fn with_last_end(mut self, last_end: DateTime<Utc>) -> Self {
        self.last_end = Some(last_end);
        self
    }

    pub fn last_end(&self) -> Option<DateTime<Utc>> {
        self.last_end
    }

    /// Window for a tick starting at `now`.
    ///
    /// `Ok(None)` when the computed start is not before `now` (clock skew);
    /// the tick should be skipped.
    ///
    /// # Errors
    /// Returns `ForwarderError::Configuration` when the start falls outside
    /// the representable time range.
    pub fn next_window(&self, now: DateTime<Utc>) -> Result<Option<TimeWindow>> {
        let start = match (self.last_end, self.pending_start) {
            (Some(last_end), _) => checked_back(last_end, self.overlap, "overlap")?,
            (None, Some(pending)) => pending,
            (None, None) => checked_back(now, self.lookback, "lookback")?,
        };
        Ok(TimeWindow::new(start, now).ok())
    }

    /// Advance `last_end` once a tick has finished.
    ///
    /// Partial delivery failures still advance; a failed fetch does not, so
    /// the next tick re-covers the window from the same start.
    pub fn complete_tick(&mut self, result: &RunResult) -> bool {
        if result.fetch_failure.is_some() {
            if self.last_end.is_none() {
                self.pending_start.get_or_insert(result.window.start());
            }
            return false;
        }
        self.last_end = Some(result.window.end());
        self.pending_start = None;
        true
    }
}

/// Time to sleep after a tick that took `elapsed`, so ticks start `interval`
/// apart. An overrunning tick yields zero; missed ticks are not replayed.
pub fn next_tick_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

fn checked_back(from: DateTime<Utc>, span: chrono::Duration, name: &str) -> Result<DateTime<Utc>> {
    from.checked_sub_signed(span)
        .ok_or_else(|| ForwarderError::Configuration(format!("{name} reaches before the earliest supported time")))
}

fn to_chrono(duration: Duration, name: &str) -> Result<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|_| ForwarderError::Configuration(format!("{name} duration is out of range")))
}
