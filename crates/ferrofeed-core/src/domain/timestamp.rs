use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const COMPACT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
const COMPACT_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");
const CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const CLOCK_MINUTES: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Resolution of a series timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Intraday,
}

/// Exchange-local timestamp of a price point or news item.
///
/// Serialized in the compact fixed-width form `YYYYMMDD` (day) or
/// `YYYYMMDDHHMMSS` (intraday), so string order and chronological order agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketTime {
    at: PrimitiveDateTime,
    granularity: Granularity,
}

impl MarketTime {
    pub fn day(date: Date) -> Self {
        Self {
            at: PrimitiveDateTime::new(date, Time::MIDNIGHT),
            granularity: Granularity::Day,
        }
    }

    pub fn intraday(at: PrimitiveDateTime) -> Self {
        Self {
            at,
            granularity: Granularity::Intraday,
        }
    }

    /// Parse a provider timestamp, inferring granularity from its precision.
    ///
    /// Accepts `2024-01-05`, `20240105`, `20240105091500`,
    /// `2024-01-05 09:15:00`, `2024-01-05 09:15` and `2024-01-05T09:15:00Z`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(at) = PrimitiveDateTime::parse(trimmed, COMPACT_DATETIME) {
            return Ok(Self::intraday(at));
        }

        let (date_part, clock_part) = split_date_time(trimmed);
        let date = parse_date_part(date_part).ok_or_else(|| invalid_timestamp(input))?;
        match clock_part {
            None => Ok(Self::day(date)),
            Some(clock) => {
                let time = parse_clock(clock).ok_or_else(|| invalid_timestamp(input))?;
                Ok(Self::intraday(PrimitiveDateTime::new(date, time)))
            }
        }
    }

    /// Parse a provider timestamp at a fixed granularity.
    ///
    /// A day granularity drops any time-of-day; an intraday granularity
    /// accepts a bare date as midnight.
    pub fn parse_with(input: &str, granularity: Granularity) -> Result<Self, ValidationError> {
        let parsed = Self::parse(input)?;
        Ok(match granularity {
            Granularity::Day => Self::day(parsed.date()),
            Granularity::Intraday => Self::intraday(parsed.at),
        })
    }

    pub fn date(self) -> Date {
        self.at.date()
    }

    pub fn datetime(self) -> PrimitiveDateTime {
        self.at
    }

    pub fn granularity(self) -> Granularity {
        self.granularity
    }

    pub fn to_compact(self) -> String {
        match self.granularity {
            Granularity::Day => compact_date(self.at.date()),
            Granularity::Intraday => self
                .at
                .format(COMPACT_DATETIME)
                .expect("calendar timestamps are always formattable"),
        }
    }
}

impl Display for MarketTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_compact())
    }
}

impl Serialize for MarketTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_compact())
    }
}

impl<'de> Deserialize<'de> for MarketTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive date window. `start` is optional for open-ended lookbacks.
///
/// Membership is decided on the date portion only, so an intraday point at
/// any time on `end` lies inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    start: Option<Date>,
    end: Date,
}

impl DateWindow {
    pub fn new(start: Option<Date>, end: Date) -> Result<Self, ValidationError> {
        if let Some(start) = start {
            if start > end {
                return Err(ValidationError::InvertedWindow { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn bounded(start: Date, end: Date) -> Result<Self, ValidationError> {
        Self::new(Some(start), end)
    }

    pub fn through(end: Date) -> Self {
        Self { start: None, end }
    }

    pub fn start(&self) -> Option<Date> {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains_date(&self, date: Date) -> bool {
        date <= self.end && self.start.map_or(true, |start| date >= start)
    }

    pub fn contains(&self, time: MarketTime) -> bool {
        self.contains_date(time.date())
    }
}

/// Parse a calendar date given as `YYYY-MM-DD` or `YYYYMMDD`.
///
/// A trailing time component (`2024-01-05T00:00:00Z`) is ignored.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    let (date_part, _) = split_date_time(input.trim());
    parse_date_part(date_part).ok_or_else(|| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

pub fn format_date(date: Date) -> String {
    date.format(ISO_DATE).expect("calendar dates are always formattable")
}

pub fn compact_date(date: Date) -> String {
    date.format(COMPACT_DATE).expect("calendar dates are always formattable")
}

/// Split `2024-01-05 09:15:00` or `2024-01-05T09:15:00Z` at the date/time separator.
fn split_date_time(input: &str) -> (&str, Option<&str>) {
    match input.split_once(|ch: char| ch == 'T' || ch == ' ') {
        Some((date, clock)) => (date, Some(clock.trim())),
        None => (input, None),
    }
}

fn parse_date_part(input: &str) -> Option<Date> {
    Date::parse(input, ISO_DATE)
        .or_else(|_| Date::parse(input, COMPACT_DATE))
        .ok()
}

/// Time of day with an optional UTC designator and fractional seconds dropped.
fn parse_clock(input: &str) -> Option<Time> {
    let clock = input.trim_end_matches('Z');
    let clock = clock.split('.').next().unwrap_or(clock);
    Time::parse(clock, CLOCK)
        .or_else(|_| Time::parse(clock, CLOCK_MINUTES))
        .ok()
}

fn invalid_timestamp(input: &str) -> ValidationError {
    ValidationError::InvalidTimestamp {
        value: input.to_owned(),
    }
}

/// Serde adapter writing a `Date` as `YYYY-MM-DD`, tolerating a time suffix on input.
pub mod iso_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(D::Error::custom)
    }
}

/// Optional variant of [`iso_date`]; `null` and empty strings map to `None`.
pub mod option_iso_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_some(&super::format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        match value.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => super::parse_date(raw).map(Some).map_err(D::Error::custom),
        }
    }
}
