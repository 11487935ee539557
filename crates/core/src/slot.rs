//! A contested one-hour reservation window.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("hour {hour} is outside 0..=23")]
    HourOutOfRange { hour: u32 },

    #[error("{year}-{month}-{day} is not a valid calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// The window `[hour, hour+1)` on a given date. Validated on
/// construction; dispatch never re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookingSlot {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl BookingSlot {
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> Result<Self, SlotError> {
        if hour > 23 {
            return Err(SlotError::HourOutOfRange { hour });
        }
        if NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(SlotError::InvalidDate { year, month, day });
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
        })
    }

    pub fn from_datetime(at: NaiveDateTime) -> Self {
        // Component ranges are guaranteed by chrono.
        Self {
            year: at.year(),
            month: at.month(),
            day: at.day(),
            hour: at.hour(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }
}

impl std::fmt::Display for BookingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{} {} ~ {}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.hour + 1
        )
    }
}
