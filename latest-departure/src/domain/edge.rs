//! Trip legs and transfers between stops.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ServiceTime, StopId};

/// Identifier of a scheduled trip.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TripId(Arc<str>);

impl TripId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TripId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<TripId> for String {
    fn from(id: TripId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Debug for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripId({})", self.as_str())
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled leg of a trip from one stop to the next.
///
/// `departure <= arrival` is expected but not enforced here; the schedule
/// source is responsible for consistent data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: StopId,
    pub to: StopId,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub trip_id: TripId,
}

impl Edge {
    pub fn new(
        from: StopId,
        to: StopId,
        departure: ServiceTime,
        arrival: ServiceTime,
        trip_id: TripId,
    ) -> Self {
        Self {
            from,
            to,
            departure,
            arrival,
            trip_id,
        }
    }
}

/// GTFS `transfer_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Recommended transfer point (0).
    Recommended,
    /// Timed transfer, the departing vehicle waits (1).
    Timed,
    /// Transfer requiring at least `min_transfer_time` (2).
    MinimumTime,
    /// Transfer not possible (3).
    NotPossible,
}

impl TransferKind {
    /// Map a GTFS `transfer_type` code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Recommended),
            1 => Some(Self::Timed),
            2 => Some(Self::MinimumTime),
            3 => Some(Self::NotPossible),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Recommended => 0,
            Self::Timed => 1,
            Self::MinimumTime => 2,
            Self::NotPossible => 3,
        }
    }
}

/// A directional walking connection with a minimum transfer time.
///
/// Transfers are calendar independent. Only minimum-time transfers are
/// handed to the traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: StopId,
    pub to: StopId,
    pub min_transfer_secs: u32,
}

impl Transfer {
    pub fn new(from: StopId, to: StopId, min_transfer_secs: u32) -> Self {
        Self {
            from,
            to,
            min_transfer_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_kind_codes() {
        for code in 0..4 {
            let kind = TransferKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(TransferKind::from_code(2), Some(TransferKind::MinimumTime));
        assert_eq!(TransferKind::from_code(7), None);
    }

    #[test]
    fn trip_id_display() {
        let trip = TripId::new("ch:1:sjyid:100001:3995-001");
        assert_eq!(trip.to_string(), "ch:1:sjyid:100001:3995-001");
        assert_eq!(format!("{:?}", TripId::new("T1")), "TripId(T1)");
    }

    #[test]
    fn trip_id_serialises_as_plain_string() {
        let json = serde_json::to_string(&TripId::new("IC 708")).unwrap();
        assert_eq!(json, "\"IC 708\"");

        let back: TripId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TripId::new("IC 708"));
    }
}
