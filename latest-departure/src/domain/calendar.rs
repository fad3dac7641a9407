//! Service calendars: which dates a scheduled trip runs on.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Column name of the weekday flag for `date`, as used by GTFS `calendar.txt`.
pub fn weekday_column(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Validity of a trip: a set of weekdays within an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCalendar {
    #[serde(default)]
    pub monday: bool,
    #[serde(default)]
    pub tuesday: bool,
    #[serde(default)]
    pub wednesday: bool,
    #[serde(default)]
    pub thursday: bool,
    #[serde(default)]
    pub friday: bool,
    #[serde(default)]
    pub saturday: bool,
    #[serde(default)]
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ServiceCalendar {
    /// A calendar running every day between `start_date` and `end_date`.
    pub fn daily(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let every_day = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        Self::on_days(&every_day, start_date, end_date)
    }

    /// A calendar running on the given weekdays between the two dates.
    pub fn on_days(days: &[Weekday], start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let mut calendar = Self {
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
            start_date,
            end_date,
        };
        for day in days {
            *calendar.flag_mut(*day) = true;
        }
        calendar
    }

    /// Whether the weekday flag is set.
    pub fn runs_on(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Whether the calendar is valid on `date`: weekday flag set and date in range.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.runs_on(date.weekday()) && self.start_date <= date && date <= self.end_date
    }

    fn flag_mut(&mut self, day: Weekday) -> &mut bool {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekday_columns() {
        // 2023-09-16 was a Saturday
        assert_eq!(weekday_column(date(2023, 9, 16)), "saturday");
        assert_eq!(weekday_column(date(2023, 9, 18)), "monday");
    }

    #[test]
    fn covers_checks_weekday() {
        let cal = ServiceCalendar::on_days(
            &[Weekday::Mon, Weekday::Fri],
            date(2023, 1, 1),
            date(2023, 12, 31),
        );
        assert!(cal.covers(date(2023, 9, 18)));
        assert!(!cal.covers(date(2023, 9, 16)));
    }

    #[test]
    fn covers_range_is_inclusive() {
        let cal = ServiceCalendar::daily(date(2023, 9, 1), date(2023, 9, 30));
        assert!(cal.covers(date(2023, 9, 1)));
        assert!(cal.covers(date(2023, 9, 30)));
        assert!(!cal.covers(date(2023, 8, 31)));
        assert!(!cal.covers(date(2023, 10, 1)));
    }

    #[test]
    fn deserialize_missing_flags_default_false() {
        let json = r#"{"saturday": true, "start_date": "2023-01-01", "end_date": "2023-12-31"}"#;
        let cal: ServiceCalendar = serde_json::from_str(json).unwrap();
        assert!(cal.saturday);
        assert!(!cal.monday);
        assert!(cal.covers(date(2023, 9, 16)));
    }
}
