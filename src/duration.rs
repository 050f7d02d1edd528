use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static HMS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})$").expect("regex compiles"));

const MAX_HOURS: u32 = 23;
const MAX_MINUTES: u32 = 59;
const MAX_SECONDS: u32 = 59;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("Duration must look like HH:MM:SS, got {0:?}")]
    Malformed(String),
    #[error("{field} must be between 0 and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Length of an exercise, entered as `HH:MM:SS` and sent as total seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ExerciseDuration(u32);

impl ExerciseDuration {
    pub const MAX_SECS: u32 = (MAX_HOURS * 3600) + (MAX_MINUTES * 60) + MAX_SECONDS;

    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, DurationError> {
        check("hours", hours, MAX_HOURS)?;
        check("minutes", minutes, MAX_MINUTES)?;
        check("seconds", seconds, MAX_SECONDS)?;
        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    pub fn from_secs(total: u32) -> Result<Self, DurationError> {
        if total > Self::MAX_SECS {
            return Err(DurationError::OutOfRange {
                field: "hours",
                value: total / 3600,
                max: MAX_HOURS,
            });
        }
        Ok(Self(total))
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    pub fn hours(self) -> u32 {
        self.0 / 3600
    }

    pub fn minutes(self) -> u32 {
        (self.0 % 3600) / 60
    }

    pub fn seconds(self) -> u32 {
        self.0 % 60
    }
}

fn check(field: &'static str, value: u32, max: u32) -> Result<(), DurationError> {
    if value > max {
        return Err(DurationError::OutOfRange { field, value, max });
    }
    Ok(())
}

impl FromStr for ExerciseDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = HMS_REGEX
            .captures(trimmed)
            .ok_or_else(|| DurationError::Malformed(trimmed.to_string()))?;
        let part = |idx: usize| -> Result<u32, DurationError> {
            caps[idx]
                .parse::<u32>()
                .map_err(|_| DurationError::Malformed(trimmed.to_string()))
        };
        Self::from_hms(part(1)?, part(2)?, part(3)?)
    }
}

impl TryFrom<u32> for ExerciseDuration {
    type Error = DurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_secs(value)
    }
}

impl From<ExerciseDuration> for u32 {
    fn from(value: ExerciseDuration) -> Self {
        value.0
    }
}

impl fmt::Display for ExerciseDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}
