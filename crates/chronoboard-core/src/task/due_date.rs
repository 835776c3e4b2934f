//! Task due dates.
//!
//! A due date is either a calendar day or a wall-clock date-time. Only the
//! latter carries its own time slot; a day-only due date is scheduled by the
//! calendar's default slot.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Text stored in the `due_date` column when a task has no due date.
pub const NO_DUE_DATE: &str = "No due date";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted date-time spellings, tried in order after RFC 3339.
const DATE_TIME_INPUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Read a wall-clock date-time in any accepted spelling. RFC 3339 input
/// keeps its local time and drops the offset.
pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATE_TIME_INPUTS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueDate {
    /// Due some time on this day.
    Date(NaiveDate),
    /// Due at this exact local time.
    DateTime(NaiveDateTime),
}

impl DueDate {
    /// Parse a stored or user-supplied due date.
    ///
    /// Returns `None` for the "no due date" sentinel, blank input and
    /// anything that is not a recognizable date.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if Self::is_absent(raw) {
            return None;
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            return Some(DueDate::Date(date));
        }
        parse_date_time(raw).map(DueDate::DateTime)
    }

    /// True for input that explicitly means "no due date".
    pub fn is_absent(raw: &str) -> bool {
        let raw = raw.trim();
        raw.is_empty() || raw == NO_DUE_DATE
    }

    /// Whether the due date pins a time of day.
    pub fn has_time(&self) -> bool {
        matches!(self, DueDate::DateTime(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            DueDate::Date(date) => *date,
            DueDate::DateTime(dt) => dt.date(),
        }
    }

    /// Canonical text form used for storage and serialization.
    pub fn to_storage(&self) -> String {
        match self {
            DueDate::Date(date) => date.format(DATE_FORMAT).to_string(),
            DueDate::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        }
    }

    /// Column value for an optional due date, substituting the sentinel.
    pub fn column_value(due_date: Option<&DueDate>) -> String {
        due_date
            .map(DueDate::to_storage)
            .unwrap_or_else(|| NO_DUE_DATE.to_string())
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage())
    }
}

impl Serialize for DueDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_storage())
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D>(deserializer: D) -> Result<DueDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DueDate::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid due date: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_date() {
        assert_eq!(DueDate::parse("2024-05-01"), Some(DueDate::Date(day(2024, 5, 1))));
    }

    #[test]
    fn parses_date_time_variants() {
        let expected = DueDate::DateTime(day(2024, 5, 1).and_hms_opt(14, 30, 0).unwrap());
        assert_eq!(DueDate::parse("2024-05-01T14:30:00"), Some(expected));
        assert_eq!(DueDate::parse("2024-05-01T14:30"), Some(expected));
        assert_eq!(DueDate::parse("2024-05-01 14:30"), Some(expected));
        assert_eq!(DueDate::parse("2024-05-01T14:30:00+02:00"), Some(expected));
    }

    #[test]
    fn sentinel_blank_and_garbage_are_absent() {
        assert_eq!(DueDate::parse(NO_DUE_DATE), None);
        assert_eq!(DueDate::parse("   "), None);
        assert_eq!(DueDate::parse("next tuesday"), None);
        assert_eq!(DueDate::parse("2024-13-40"), None);
        assert!(DueDate::is_absent(""));
        assert!(!DueDate::is_absent("tomorrow"));
    }

    #[test]
    fn storage_form_is_canonical() {
        let at = DueDate::DateTime(NaiveDateTime::new(day(2024, 5, 1), NaiveTime::from_hms_opt(9, 5, 0).unwrap()));
        assert_eq!(at.to_storage(), "2024-05-01T09:05:00");
        assert_eq!(DueDate::Date(day(2024, 5, 1)).to_storage(), "2024-05-01");
        assert_eq!(DueDate::column_value(None), NO_DUE_DATE);
    }

    #[test]
    fn serde_uses_storage_form() {
        let due = DueDate::Date(day(2024, 5, 1));
        let json = serde_json::to_string(&due).unwrap();
        assert_eq!(json, "\"2024-05-01\"");
        let back: DueDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, due);
        assert!(serde_json::from_str::<DueDate>("\"soon\"").is_err());
    }
}
