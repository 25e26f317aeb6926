//! Time entry model and the positional event rules for batch posting.
//!
//! A [`TimeEntry`] is one work interval on a calendar date. When a day's
//! entries are posted together, the service expects an alternating
//! clock-in/break/clock-out sequence; the event kind of each boundary is
//! inferred purely from the entry's position in the caller-ordered list
//! (see [`event_pair`]).

use crate::api::attendance::EventType;
use crate::libs::messages::Message;
use crate::msg_error_anyhow;
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// One work period: a half-open `[start, stop)` interval on a single date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl TimeEntry {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self { start, stop }
    }

    /// Parses a command-line entry of the form `HH:MM,HH:MM` onto `date`.
    pub fn parse(raw: &str, date: NaiveDate) -> Result<Self> {
        let (start, stop) = raw
            .split_once(',')
            .ok_or_else(|| msg_error_anyhow!(Message::InvalidEntryFormat(raw.to_string())))?;
        let start = parse_time(start.trim(), raw)?;
        let stop = parse_time(stop.trim(), raw)?;

        Ok(Self::new(date.and_time(start), date.and_time(stop)))
    }
}

fn parse_time(raw: &str, entry: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| msg_error_anyhow!(Message::InvalidEntryFormat(entry.to_string())))
}

/// Event kinds for the start and stop boundaries of the entry at `index`
/// in a list of `len` entries.
///
/// - sole entry: (clock in, clock out)
/// - first of several: (clock in, start break)
/// - last of several: (end break, clock out)
/// - any middle entry: (end break, start break)
pub fn event_pair(index: usize, len: usize) -> (EventType, EventType) {
    if len == 1 {
        (EventType::ClockIn, EventType::ClockOut)
    } else if index == 0 {
        (EventType::ClockIn, EventType::StartBreak)
    } else if index == len - 1 {
        (EventType::EndBreak, EventType::ClockOut)
    } else {
        (EventType::EndBreak, EventType::StartBreak)
    }
}
