//! Half-open time windows used to query the source

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ForwarderError, Result};

/// The interval `[start, end)`; `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// # Errors
    /// Returns `ForwarderError::Configuration` when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(ForwarderError::Configuration(format!(
                "window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of length `lookback` ending at `end`.
    ///
    /// # Errors
    /// Returns `ForwarderError::Configuration` when `lookback` is not positive
    /// or reaches before the earliest representable time.
    pub fn ending_at(end: DateTime<Utc>, lookback: Duration) -> Result<Self> {
        let start = end.checked_sub_signed(lookback).ok_or_else(|| {
            ForwarderError::Configuration(format!("lookback of {lookback} from {end} is out of range"))
        })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
