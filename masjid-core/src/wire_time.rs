//! Conversion between the table's time columns and editable times of day.
//!
//! The table stores `HH:MM:SS+05:00`. A wire value is read as a time on the
//! 1970-01-01 reference date in its own offset, then viewed in the fixed UTC+5
//! zone the app writes with. Only hour and minute survive a round-trip.

use chrono::{NaiveTime, TimeDelta, Timelike};

use crate::error::WireTimeError;

/// Offset every written value carries, in seconds east of UTC.
pub const WIRE_OFFSET_SECS: i32 = 5 * 3600;
const WIRE_OFFSET_SUFFIX: &str = "+05:00";

pub fn parse_wire_time(value: &str) -> Result<NaiveTime, WireTimeError> {
    let trimmed = value.trim();
    let invalid = || WireTimeError::Invalid(value.to_string());

    let (clock, offset_secs) = split_offset(trimmed).ok_or_else(invalid)?;

    let time = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(clock, fmt).ok())
        .ok_or_else(invalid)?;

    let shift = TimeDelta::seconds(i64::from(WIRE_OFFSET_SECS - offset_secs));
    let (shifted, _) = time.overflowing_add_signed(shift);

    Ok(shifted)
}

/// Serialize with zeroed seconds and the fixed `+05:00` offset.
pub fn format_wire_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}:00{WIRE_OFFSET_SUFFIX}", time.hour(), time.minute())
}

pub fn display_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Parse user input such as `5:30` or `05:30`.
pub fn parse_clock(value: &str) -> Result<NaiveTime, WireTimeError> {
    let trimmed = value.trim();
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| WireTimeError::Invalid(value.to_string()))
}

/// Split `05:17:00+05:00` into the clock part and the offset in seconds.
/// A value without an offset is taken to be in the wire zone already.
fn split_offset(value: &str) -> Option<(&str, i32)> {
    if let Some(clock) = value.strip_suffix(['Z', 'z']) {
        return Some((clock, 0));
    }

    let Some(idx) = value.rfind(['+', '-']) else {
        return Some((value, WIRE_OFFSET_SECS));
    };

    let (clock, offset) = value.split_at(idx);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };

    if hours > 23 || minutes > 59 {
        return None;
    }

    Some((clock, sign * (hours * 3600 + minutes * 60)))
}
