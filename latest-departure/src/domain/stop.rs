//! Stop identity and reference data.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid stop id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// A stable stop identifier as it appears in the schedule.
///
/// Ids are opaque strings (e.g. `"8503000:0:5"`). They must be non-empty
/// and carry no surrounding whitespace. Cloning is cheap.
///
/// # Examples
///
/// ```
/// use latest_departure::domain::StopId;
///
/// let id = StopId::parse("8503000").unwrap();
/// assert_eq!(id.as_str(), "8503000");
///
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse(" 8503000").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopId(Arc<str>);

impl StopId {
    /// Parse a stop id from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }
        if s.trim() != s {
            return Err(InvalidStopId {
                reason: "must not have surrounding whitespace",
            });
        }
        Ok(StopId(Arc::from(s)))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StopId {
    type Error = InvalidStopId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StopId> for String {
    fn from(id: StopId) -> Self {
        id.0.to_string()
    }
}

impl Borrow<str> for StopId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.as_str())
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical stop: identity, display name and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    /// Create a new stop.
    pub fn new(id: StopId, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lon,
        }
    }
}
