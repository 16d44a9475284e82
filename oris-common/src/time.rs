//! Time codec for split times and event dates
//!
//! Split times arrive from the results service as loosely formatted clock strings
//! ("34:12", "1:02:45", sometimes "75:30" with minutes past the hour). They are normalized
//! into [`RaceTime`], a time of day on a fixed reference date, so that comparisons and
//! differences are well defined.

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Seconds in one day; normalized times must stay below this
const SECONDS_PER_DAY: u32 = 86_400;

/// Text the results service uses for a disqualified competitor
pub const DISQUALIFIED_MARK: &str = "DISK";

/// Anchor date for [`RaceTime::anchored`] (plotting libraries want full timestamps)
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default()
}

/// Normalized elapsed race time (always non-negative, below 24h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RaceTime(NaiveTime);

impl RaceTime {
    /// Start of the race (00:00:00)
    pub const ZERO: RaceTime = RaceTime(NaiveTime::MIN);

    /// Parse "mm:ss" or "hh:mm:ss"
    ///
    /// Two fields are minutes and seconds. Minutes of 60 or more carry into the hours,
    /// so "01:75:10" and "02:15:10" are the same value.
    ///
    /// # Examples
    /// ```
    /// use oris_common::RaceTime;
    ///
    /// assert_eq!(RaceTime::parse("75:30").unwrap().to_string(), "01:15:30");
    /// assert_eq!(RaceTime::parse("1:02:03").unwrap().to_string(), "01:02:03");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let fields: Vec<&str> = text.split(':').collect();
        let (h, m, s) = match fields.as_slice() {
            [m, s] => ("0", *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => {
                return Err(Error::Parse(format!(
                    "expected mm:ss or hh:mm:ss, got '{}'",
                    text
                )))
            }
        };

        let mut hours = parse_field(h, text)?;
        let mut minutes = parse_field(m, text)?;
        let seconds = parse_field(s, text)?;
        if seconds >= 60 {
            return Err(Error::Parse(format!("seconds out of range in '{}'", text)));
        }

        hours = hours
            .checked_add(minutes / 60)
            .ok_or_else(|| Error::Range(format!("'{}' overflows", text)))?;
        minutes %= 60;

        let total = hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .ok_or_else(|| Error::Range(format!("'{}' overflows", text)))?;
        Self::from_seconds(total)
    }

    /// Build from whole seconds since the start
    pub fn from_seconds(seconds: u32) -> Result<Self> {
        if seconds >= SECONDS_PER_DAY {
            return Err(Error::Range(format!(
                "{} s does not fit into one day",
                seconds
            )));
        }
        NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
            .map(RaceTime)
            .ok_or_else(|| Error::Range(format!("{} s is not a valid time", seconds)))
    }

    /// Difference `self - baseline`
    ///
    /// The baseline is the minimum of the compared set, so a negative difference is a
    /// caller bug and is reported as [`Error::Range`] instead of wrapping.
    pub fn relative_to(&self, baseline: RaceTime) -> Result<RaceTime> {
        let diff = self.0.signed_duration_since(baseline.0).num_seconds();
        if diff < 0 {
            return Err(Error::Range(format!(
                "{} is ahead of baseline {}",
                self, baseline
            )));
        }
        Self::from_seconds(diff as u32)
    }

    /// Whole seconds since the start
    pub fn as_seconds(&self) -> u32 {
        self.0.num_seconds_from_midnight()
    }

    /// Timestamp on the reference date
    pub fn anchored(&self) -> NaiveDateTime {
        reference_date().and_time(self.0)
    }
}

fn parse_field(field: &str, text: &str) -> Result<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!("non-numeric field in '{}'", text)));
    }
    field
        .parse::<u32>()
        .map_err(|e| Error::Parse(format!("'{}': {}", text, e)))
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl Serialize for RaceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RaceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        RaceTime::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// One time slot of a result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeCell {
    Time(RaceTime),
    /// Competitor was disqualified (mispunch, did not finish)
    Disqualified,
    /// Nothing recorded for this slot
    #[default]
    NoData,
}

impl TimeCell {
    /// Parse a cell as delivered by the results service
    ///
    /// Loss columns carry a leading '+', which is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text {
            "" | "-" | "---" => Ok(TimeCell::NoData),
            DISQUALIFIED_MARK | "DSQ" => Ok(TimeCell::Disqualified),
            other => RaceTime::parse(other.trim_start_matches('+')).map(TimeCell::Time),
        }
    }

    pub fn time(&self) -> Option<RaceTime> {
        match self {
            TimeCell::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_disqualified(&self) -> bool {
        matches!(self, TimeCell::Disqualified)
    }
}

impl fmt::Display for TimeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeCell::Time(t) => t.fmt(f),
            TimeCell::Disqualified => f.write_str(DISQUALIFIED_MARK),
            TimeCell::NoData => f.write_str("---"),
        }
    }
}

impl Serialize for TimeCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an API date ("2021-05-03")
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| Error::Parse(format!("date '{}': {}", text, e)))
}

/// Czech display form of a date ("03.05.2021")
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// First and last day of a season
pub fn season_bounds(season: i32) -> Result<(NaiveDate, NaiveDate)> {
    let from = NaiveDate::from_ymd_opt(season, 1, 1);
    let to = NaiveDate::from_ymd_opt(season, 12, 31);
    from.zip(to)
        .ok_or_else(|| Error::InvalidInput(format!("season {}", season)))
}

/// Season used when the caller does not name one
pub fn current_season() -> i32 {
    chrono::Local::now().year()
}
