//! Timeout profiles and the timespan grammar.
//!
//! # Responsibilities
//! - Represent a (connect, call) timeout pair as an immutable value
//! - Parse configured timespans (`500ms`, `2s`, `1.5m`, `1h`, `1d`)
//!
//! # Design Decisions
//! - Profiles compare by value; they double as client pool keys
//! - A bare number takes the unit chosen by the caller
//! - Malformed values are errors, never silently defaulted

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error produced when a timespan string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid timespan [{value}]. Should be a number or have 'ms', 's', 'm', 'h', 'd' as suffix.")]
pub struct TimespanError {
    pub value: String,
}

/// Unit applied to a timespan without suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn multiplier(self) -> f64 {
        match self {
            TimeUnit::Millis => 1.0,
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
        }
    }
}

/// Parse a timespan into milliseconds.
pub fn parse_timespan(value: &str, default_unit: TimeUnit) -> Result<u64, TimespanError> {
    let err = || TimespanError {
        value: value.to_string(),
    };
    let trimmed = value.trim();

    if let Some(number) = trimmed.strip_suffix("ms") {
        return number.trim().parse::<u64>().map_err(|_| err());
    }

    let (number, unit) = match trimmed.chars().last() {
        Some('s') => (&trimmed[..trimmed.len() - 1], TimeUnit::Seconds),
        Some('m') => (&trimmed[..trimmed.len() - 1], TimeUnit::Minutes),
        Some('h') => (&trimmed[..trimmed.len() - 1], TimeUnit::Hours),
        Some('d') => (&trimmed[..trimmed.len() - 1], TimeUnit::Days),
        Some(_) => (trimmed, default_unit),
        None => return Err(err()),
    };

    let amount: f64 = number.trim().parse().map_err(|_| err())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(err());
    }
    Ok((amount * unit.multiplier()) as u64)
}

/// Connect and call timeouts for one outbound client, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutProfile {
    pub connect_millis: u64,
    pub call_millis: u64,
}

impl TimeoutProfile {
    /// Process-wide default: 5 seconds to connect, 2 minutes per call.
    pub const DEFAULT: TimeoutProfile = TimeoutProfile {
        connect_millis: 5_000,
        call_millis: 120_000,
    };

    pub const fn new(connect_millis: u64, call_millis: u64) -> Self {
        Self {
            connect_millis,
            call_millis,
        }
    }

    /// Same connect timeout, different call timeout.
    pub fn with_call(self, call_millis: u64) -> Self {
        Self {
            call_millis,
            ..self
        }
    }

    /// Derive a profile from optional configured overrides.
    ///
    /// `timeout` sets the call timeout and `connect_timeout` the connect timeout;
    /// bare numbers are milliseconds. Missing values inherit from `self`.
    pub fn inherit(
        self,
        timeout: Option<&str>,
        connect_timeout: Option<&str>,
    ) -> Result<Self, TimespanError> {
        let call_millis = match timeout {
            Some(v) => parse_timespan(v, TimeUnit::Millis)?,
            None => self.call_millis,
        };
        let connect_millis = match connect_timeout {
            Some(v) => parse_timespan(v, TimeUnit::Millis)?,
            None => self.connect_millis,
        };
        Ok(Self {
            connect_millis,
            call_millis,
        })
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_millis)
    }

    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_millis)
    }
}

impl Default for TimeoutProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn write_span(f: &mut fmt::Formatter<'_>, ms: u64) -> fmt::Result {
    if ms < 2_000 {
        write!(f, "{}ms", ms)
    } else {
        let secs = ms as f64 / 1_000.0;
        if secs < 120.0 {
            write!(f, "{:.2}s", secs)
        } else {
            write!(f, "{:.2}m", secs / 60.0)
        }
    }
}

impl fmt::Display for TimeoutProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[call=")?;
        write_span(f, self.call_millis)?;
        write!(f, ", conn=")?;
        write_span(f, self.connect_millis)?;
        write!(f, "]")
    }
}
