//! Default race schedule.
//!
//! The portals unlock a day's slots at midnight two weeks ahead: the
//! race happens at the next occurrence of the configured weekday, and
//! the default targets are that day plus fourteen days at 20:00 and
//! 21:00.

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDateTime};

/// Midnight of the next occurrence of `weekday` (ISO, 1 = Monday), today
/// included.
pub fn next_open_instant(now: NaiveDateTime, weekday: u32) -> Result<NaiveDateTime> {
    if !(1..=7).contains(&weekday) {
        bail!("weekday {weekday} is outside 1..=7");
    }

    let today = now.date();
    let ahead = (weekday as i64 - today.weekday().number_from_monday() as i64).rem_euclid(7);
    Ok((today + Duration::days(ahead))
        .and_hms_opt(0, 0, 0)
        .expect("midnight always exists"))
}

/// The conventional targets: two weeks past the open date, 20:00 and
/// 21:00.
pub fn default_slot_times(open_at: NaiveDateTime) -> Vec<NaiveDateTime> {
    let day = open_at.date() + Duration::days(14);
    vec![
        day.and_hms_opt(20, 0, 0).expect("valid hour"),
        day.and_hms_opt(21, 0, 0).expect("valid hour"),
    ]
}
