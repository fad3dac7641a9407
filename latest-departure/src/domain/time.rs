//! Service time handling.
//!
//! Schedules express times as offsets from midnight of the service date.
//! GTFS-style feeds allow hours past 24 for trips that run after midnight
//! but still belong to the previous service day, so a `ServiceTime` is a
//! plain count of seconds rather than a wall-clock time.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seconds in one hour.
pub const SECS_PER_HOUR: u32 = 3600;

/// Largest hour accepted in feed data (two service days).
const MAX_FEED_HOUR: u32 = 47;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day on a service date, as seconds since midnight.
///
/// # Examples
///
/// ```
/// use latest_departure::domain::ServiceTime;
///
/// let time = ServiceTime::parse_hhmm("14:30").unwrap();
/// assert_eq!(time.seconds(), 14 * 3600 + 30 * 60);
/// assert_eq!(time.to_string(), "14:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Midnight at the start of the service date.
    pub const MIDNIGHT: ServiceTime = ServiceTime(0);

    /// Create a time from seconds since midnight.
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Create a time from hour, minute and second components.
    ///
    /// Hours may exceed 23 for after-midnight service.
    pub const fn from_hms(hour: u32, minute: u32, second: u32) -> Self {
        Self(hour * SECS_PER_HOUR + minute * 60 + second)
    }

    /// Parse a user-supplied "HH:MM" time of day.
    ///
    /// # Examples
    ///
    /// ```
    /// use latest_departure::domain::ServiceTime;
    ///
    /// assert!(ServiceTime::parse_hhmm("00:00").is_ok());
    /// assert!(ServiceTime::parse_hhmm("23:59").is_ok());
    ///
    /// assert!(ServiceTime::parse_hhmm("1430").is_err());
    /// assert!(ServiceTime::parse_hhmm("14:3").is_err());
    /// assert!(ServiceTime::parse_hhmm("25:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        Ok(Self::from_hms(hour, minute, 0))
    }

    /// Parse a feed time: "H:MM", "HH:MM" or "HH:MM:SS", hours up to 47.
    ///
    /// ```
    /// use latest_departure::domain::ServiceTime;
    ///
    /// assert_eq!(ServiceTime::parse_feed("7:05").unwrap().seconds(), 7 * 3600 + 300);
    /// assert_eq!(ServiceTime::parse_feed("25:10:30").unwrap().hour(), 25);
    /// assert!(ServiceTime::parse_feed("48:00").is_err());
    /// ```
    pub fn parse_feed(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.split(':');
        let hour = parts
            .next()
            .filter(|h| (1..=2).contains(&h.len()))
            .and_then(|h| h.parse::<u32>().ok())
            .ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > MAX_FEED_HOUR {
            return Err(TimeError::new("hour must be 0-47"));
        }

        let minute = parts
            .next()
            .and_then(|m| parse_two_digits(m.as_bytes()))
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = match parts.next() {
            Some(sec) => parse_two_digits(sec.as_bytes())
                .filter(|s| *s <= 59)
                .ok_or_else(|| TimeError::new("invalid second digits"))?,
            None => 0,
        };

        if parts.next().is_some() {
            return Err(TimeError::new("too many components"));
        }

        Ok(Self::from_hms(hour, minute, second))
    }

    /// Convert a wall-clock time into a service time on the same day.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self(time.num_seconds_from_midnight())
    }

    /// Returns seconds since midnight.
    pub const fn seconds(&self) -> u32 {
        self.0
    }

    /// Returns the hour, which may exceed 23.
    pub fn hour(&self) -> u32 {
        self.0 / SECS_PER_HOUR
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        (self.0 % SECS_PER_HOUR) / 60
    }

    /// Returns the second (0-59).
    pub fn second(&self) -> u32 {
        self.0 % 60
    }

    /// Subtract a number of seconds, `None` if the result would precede midnight.
    pub fn checked_sub_secs(&self, secs: u32) -> Option<Self> {
        self.0.checked_sub(secs).map(Self)
    }

    /// Subtract a number of seconds, clamping at midnight.
    pub fn saturating_sub_secs(&self, secs: u32) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds from `earlier` to `self`; negative if `earlier` is later.
    pub fn signed_secs_since(&self, earlier: Self) -> i64 {
        i64::from(self.0) - i64::from(earlier.0)
    }

    /// Formats as "HH:MM", dropping seconds.
    pub fn to_hhmm(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServiceTime({:02}:{:02}:{:02})",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.second() == 0 {
            write!(f, "{:02}:{:02}", self.hour(), self.minute())
        } else {
            write!(
                f,
                "{:02}:{:02}:{:02}",
                self.hour(),
                self.minute(),
                self.second()
            )
        }
    }
}

impl FromStr for ServiceTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_feed(s)
    }
}

impl Serialize for ServiceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_feed(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}
