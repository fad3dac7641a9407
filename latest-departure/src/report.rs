//! Serialisable views of traversal results.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::itinerary::{Itinerary, Segment};
use crate::traversal::ReachMap;

/// One stop in the rendered mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopReport {
    /// Stop name
    pub name: String,

    pub lat: f64,
    pub lon: f64,

    /// Latest departure as "HH:MM", or null if unreachable
    pub departure: Option<String>,

    /// Next stop on the way to the destination
    pub predecessor: Option<String>,

    /// Trip id, or "transfer" for a walk
    pub trip_id: Option<String>,
}

/// Render every stop, keyed by stop id in sorted order.
pub fn render(map: &ReachMap) -> BTreeMap<String, StopReport> {
    map.stops
        .iter()
        .map(|(id, entry)| {
            let label = &entry.label;
            let report = StopReport {
                name: entry.stop.name.clone(),
                lat: entry.stop.lat,
                lon: entry.stop.lon,
                departure: label.departure.map(|d| d.to_hhmm()),
                predecessor: label.predecessor.as_ref().map(|p| p.to_string()),
                trip_id: label.via.as_ref().map(|v| v.as_str().to_string()),
            };
            (id.to_string(), report)
        })
        .collect()
}

/// A segment of a rendered itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentReport {
    Ride {
        trip_id: String,
        from: String,
        to: String,
        departure: String,
        via_stops: Vec<String>,
    },
    Walk {
        from: String,
        to: String,
        departure: String,
        duration_mins: u32,
    },
}

/// A rendered itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItineraryReport {
    pub origin: String,
    pub destination: String,
    pub departure: String,
    pub target: String,
    pub segments: Vec<SegmentReport>,
}

impl From<&Itinerary> for ItineraryReport {
    fn from(itinerary: &Itinerary) -> Self {
        let segments = itinerary
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Ride(ride) => SegmentReport::Ride {
                    trip_id: ride.trip_id.to_string(),
                    from: ride.from.to_string(),
                    to: ride.to.to_string(),
                    departure: ride.departure.to_hhmm(),
                    via_stops: ride.via_stops.iter().map(|s| s.to_string()).collect(),
                },
                Segment::Walk(walk) => SegmentReport::Walk {
                    from: walk.from.to_string(),
                    to: walk.to.to_string(),
                    departure: walk.departure.to_hhmm(),
                    duration_mins: walk.duration_secs.div_ceil(60),
                },
            })
            .collect();

        Self {
            origin: itinerary.origin.to_string(),
            destination: itinerary.destination.to_string(),
            departure: itinerary.departure.to_hhmm(),
            target: itinerary.target.to_hhmm(),
            segments,
        }
    }
}

/// Full output of one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub destination: String,
    pub target: String,
    pub earliest_departure: String,
    pub reachable: usize,
    pub stops: BTreeMap<String, StopReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<ItineraryReport>,
}

impl QueryReport {
    pub fn new(map: &ReachMap, itinerary: Option<&Itinerary>) -> Self {
        Self {
            destination: map.destination.to_string(),
            target: map.target.to_hhmm(),
            earliest_departure: map.earliest_departure.to_hhmm(),
            reachable: map.reachable_count(),
            stops: render(map),
            itinerary: itinerary.map(ItineraryReport::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServiceTime, Stop, StopId, TripId};
    use crate::itinerary::{Ride, Walk};
    use crate::traversal::{Label, StopLabel, TraversalStats, Via};

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse_hhmm(s).unwrap()
    }

    fn sample_map() -> ReachMap {
        let mut stops = BTreeMap::new();
        stops.insert(
            id("8503000"),
            StopLabel {
                stop: Stop::new(id("8503000"), "Zürich HB", 47.378, 8.540),
                label: Label::destination(t("08:30")),
            },
        );
        stops.insert(
            id("8507000"),
            StopLabel {
                stop: Stop::new(id("8507000"), "Bern", 46.949, 7.439),
                label: Label {
                    departure: Some(ServiceTime::from_hms(7, 2, 30)),
                    predecessor: Some(id("8503000")),
                    via: Some(Via::Trip(TripId::new("IC1"))),
                },
            },
        );
        stops.insert(
            id("8509000"),
            StopLabel {
                stop: Stop::new(id("8509000"), "Chur", 46.853, 9.529),
                label: Label::unreachable(),
            },
        );
        ReachMap {
            destination: id("8503000"),
            target: t("08:30"),
            earliest_departure: ServiceTime::MIDNIGHT,
            stops,
            finalized: vec![id("8503000"), id("8507000")],
            stats: TraversalStats::default(),
        }
    }

    #[test]
    fn renders_departures_as_hhmm() {
        let rendered = render(&sample_map());

        assert_eq!(rendered.len(), 3);
        let bern = &rendered["8507000"];
        assert_eq!(bern.departure.as_deref(), Some("07:02"));
        assert_eq!(bern.predecessor.as_deref(), Some("8503000"));
        assert_eq!(bern.trip_id.as_deref(), Some("IC1"));

        let zurich = &rendered["8503000"];
        assert_eq!(zurich.departure.as_deref(), Some("08:30"));
        assert_eq!(zurich.predecessor, None);

        let json = serde_json::to_value(bern).unwrap();
        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["departure", "lat", "lon", "name", "predecessor", "trip_id"]
        );
        assert_eq!(json["predecessor"], "8503000");
        assert_eq!(json["trip_id"], "IC1");
    }

    #[test]
    fn unreachable_serialises_as_null() {
        let rendered = render(&sample_map());
        let json = serde_json::to_value(&rendered["8509000"]).unwrap();

        assert_eq!(json["name"], "Chur");
        assert!(json["departure"].is_null());
        assert!(json["predecessor"].is_null());
        assert!(json["trip_id"].is_null());
    }

    #[test]
    fn keys_are_sorted() {
        let json = serde_json::to_string(&render(&sample_map())).unwrap();

        let a = json.find("\"8503000\":").unwrap();
        let b = json.find("\"8507000\":").unwrap();
        let c = json.find("\"8509000\":").unwrap();
        assert!(a < b && b < c);

        let report = serde_json::to_string(&QueryReport::new(&sample_map(), None)).unwrap();
        assert!(!report.contains("itinerary"));
    }

    #[test]
    fn query_report_summary() {
        let report = QueryReport::new(&sample_map(), None);

        assert_eq!(report.destination, "8503000");
        assert_eq!(report.target, "08:30");
        assert_eq!(report.earliest_departure, "00:00");
        assert_eq!(report.reachable, 2);
    }

    #[test]
    fn itinerary_segments_are_tagged() {
        let itinerary = Itinerary {
            origin: id("C"),
            destination: id("A"),
            departure: t("07:30"),
            target: t("08:30"),
            segments: vec![
                Segment::Ride(Ride {
                    trip_id: TripId::new("T2"),
                    from: id("C"),
                    to: id("D"),
                    departure: t("07:30"),
                    via_stops: vec![],
                }),
                Segment::Walk(Walk {
                    from: id("D"),
                    to: id("A"),
                    departure: t("08:00"),
                    duration_secs: 90,
                }),
            ],
        };

        let json = serde_json::to_value(ItineraryReport::from(&itinerary)).unwrap();

        assert_eq!(json["segments"][0]["kind"], "ride");
        assert_eq!(json["segments"][0]["trip_id"], "T2");
        assert_eq!(json["segments"][1]["kind"], "walk");
        assert_eq!(json["segments"][1]["duration_mins"], 2);
        assert_eq!(json["departure"], "07:30");
    }
}
