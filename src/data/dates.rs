//! Date & Period Module
//! Date parsing, month periods, approximate ages and fixed age bands.

use super::ParseError;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::fmt;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a date cell, failing on anything unrecognised.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(ParseError::Date(raw.to_string()))
}

/// Parse a date cell, mapping blanks and failures to `None`.
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        return None;
    }
    parse_date(raw).ok()
}

/// Calendar month, represented by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

impl Period {
    /// Truncate a date to the first day of its month.
    pub fn of(date: NaiveDate) -> Self {
        Period(date - Days::new(u64::from(date.day0())))
    }

    pub fn start(&self) -> NaiveDate {
        self.0
    }

    /// Sortable grouping key, e.g. `2025-04`.
    pub fn key(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }

    /// Inverse of [`Period::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
            .ok()
            .map(Period)
    }

    /// Whether `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Period::of(date) == *self
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%m/%Y"))
    }
}

/// Whole years between birth and registration: `floor(days / 365)`.
///
/// Leap days are ignored, so this drifts from the calendar age around
/// birthdays.
pub fn age_years(birth: Option<NaiveDate>, registration: Option<NaiveDate>) -> Option<i64> {
    let (birth, registration) = (birth?, registration?);
    let days = registration.signed_duration_since(birth).num_days();
    Some(days.div_euclid(365))
}

/// Fixed age bands used by the patient dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    Child,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
    Elderly,
}

impl AgeBand {
    /// All bands in display order.
    pub const ALL: [AgeBand; 6] = [
        AgeBand::Child,
        AgeBand::YoungAdult,
        AgeBand::Adult,
        AgeBand::MiddleAged,
        AgeBand::Senior,
        AgeBand::Elderly,
    ];

    /// Map an age to its band; ages outside `0..=100` have none.
    pub fn from_age(age: i64) -> Option<Self> {
        match age {
            0..=17 => Some(AgeBand::Child),
            18..=25 => Some(AgeBand::YoungAdult),
            26..=35 => Some(AgeBand::Adult),
            36..=45 => Some(AgeBand::MiddleAged),
            46..=60 => Some(AgeBand::Senior),
            61..=100 => Some(AgeBand::Elderly),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Child => "0-17",
            AgeBand::YoungAdult => "18-25",
            AgeBand::Adult => "26-35",
            AgeBand::MiddleAged => "36-45",
            AgeBand::Senior => "46-60",
            AgeBand::Elderly => "60+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        AgeBand::ALL.into_iter().find(|b| b.label() == label)
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
