use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Weekly working window for one day of the week.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatingDay {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OperatingDay {
    fn default_for(day: Weekday) -> Self {
        let enabled = !matches!(day, Weekday::Sat | Weekday::Sun);
        Self {
            enabled,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    fn contains(&self, time: NaiveTime) -> bool {
        self.enabled && time >= self.start && time < self.end
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    #[error("Invalid operating window for {day}: start {start} must be before end {end}")]
    InvalidWindow {
        day: String,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("Unrecognised time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Unrecognised weekday '{0}'")]
    InvalidWeekday(String),
}

const SUNDAY_FIRST: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Blocked dates plus weekly operating hours for a single vendor.
///
/// Only the owning vendor mutates a calendar; concurrent saves are last-writer-wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityCalendar {
    pub vendor_id: String,
    blocked_dates: BTreeSet<NaiveDate>,
    /// Indexed Sunday-first.
    operating_days: [OperatingDay; 7],
}

impl AvailabilityCalendar {
    /// Weekdays open 09:00-17:00, weekends closed, nothing blocked.
    pub fn new(vendor_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            blocked_dates: BTreeSet::new(),
            operating_days: SUNDAY_FIRST.map(OperatingDay::default_for),
        }
    }

    /// Flip the blocked flag for `date`. Returns whether the date is now blocked.
    /// Past dates are accepted.
    pub fn toggle_blocked(&mut self, date: NaiveDate) -> bool {
        if self.blocked_dates.remove(&date) {
            false
        } else {
            self.blocked_dates.insert(date);
            true
        }
    }

    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.blocked_dates.contains(&date)
    }

    pub fn blocked_dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.blocked_dates.iter()
    }

    pub fn operating_day(&self, day: Weekday) -> &OperatingDay {
        &self.operating_days[day.num_days_from_sunday() as usize]
    }

    /// Weekdays paired with their windows, Sunday first.
    pub fn week(&self) -> impl Iterator<Item = (Weekday, &OperatingDay)> {
        SUNDAY_FIRST.iter().copied().zip(self.operating_days.iter())
    }

    pub fn set_operating_day(
        &mut self,
        day: Weekday,
        enabled: bool,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), CalendarError> {
        if enabled && start >= end {
            return Err(CalendarError::InvalidWindow {
                day: day.to_string(),
                start,
                end,
            });
        }

        self.operating_days[day.num_days_from_sunday() as usize] = OperatingDay { enabled, start, end };
        Ok(())
    }

    pub fn is_open(&self, date: NaiveDate, time: NaiveTime) -> bool {
        if self.is_blocked(date) {
            return false;
        }
        self.operating_day(date.weekday()).contains(time)
    }
}

/// Parse "HH:MM" or "HH:MM:SS".
pub fn parse_clock(raw: &str) -> Result<NaiveTime, CalendarError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTime(raw.to_string()))
}

/// Parse "monday", "Mon", "SUNDAY" and so on.
pub fn parse_weekday(raw: &str) -> Result<Weekday, CalendarError> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| CalendarError::InvalidWeekday(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_default_week() {
        let cal = AvailabilityCalendar::new("vendor_12345xyz");
        assert!(!cal.operating_day(Weekday::Sun).enabled);
        assert!(!cal.operating_day(Weekday::Sat).enabled);
        assert!(cal.operating_day(Weekday::Wed).enabled);
        assert_eq!(cal.operating_day(Weekday::Mon).start, hm(9, 0));
        assert_eq!(cal.week().count(), 7);
    }

    #[test]
    fn test_is_open_window_is_half_open() {
        let cal = AvailabilityCalendar::new("v1");
        // 2025-06-02 is a Monday
        let monday = date(2025, 6, 2);
        assert!(cal.is_open(monday, hm(9, 0)));
        assert!(cal.is_open(monday, hm(16, 59)));
        assert!(!cal.is_open(monday, hm(17, 0)));
        assert!(!cal.is_open(monday, hm(8, 59)));

        let saturday = date(2025, 6, 7);
        assert!(!cal.is_open(saturday, hm(10, 0)));
    }

    #[test]
    fn test_blocked_date_closes_the_day() {
        let mut cal = AvailabilityCalendar::new("v1");
        let monday = date(2025, 6, 2);
        assert!(cal.toggle_blocked(monday));
        assert!(!cal.is_open(monday, hm(10, 0)));
        assert!(!cal.toggle_blocked(monday));
        assert!(cal.is_open(monday, hm(10, 0)));
    }

    #[test]
    fn test_past_dates_can_be_blocked() {
        let mut cal = AvailabilityCalendar::new("v1");
        assert!(cal.toggle_blocked(date(2001, 1, 1)));
        assert!(cal.is_blocked(date(2001, 1, 1)));
    }

    #[test]
    fn test_set_operating_day() {
        let mut cal = AvailabilityCalendar::new("v1");
        cal.set_operating_day(Weekday::Sat, true, hm(6, 0), hm(11, 0)).unwrap();
        assert!(cal.is_open(date(2025, 6, 7), hm(6, 30)));

        let err = cal.set_operating_day(Weekday::Mon, true, hm(17, 0), hm(9, 0)).unwrap_err();
        assert!(matches!(err, CalendarError::InvalidWindow { .. }));
        let err = cal.set_operating_day(Weekday::Mon, true, hm(9, 0), hm(9, 0)).unwrap_err();
        assert!(matches!(err, CalendarError::InvalidWindow { .. }));

        // A disabled day keeps whatever window it is given
        cal.set_operating_day(Weekday::Tue, false, hm(17, 0), hm(9, 0)).unwrap();
        assert!(!cal.is_open(date(2025, 6, 3), hm(10, 0)));
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_clock("07:30").unwrap(), hm(7, 30));
        assert_eq!(parse_clock("07:30:00").unwrap(), hm(7, 30));
        assert!(parse_clock("7.30pm").is_err());
        assert_eq!(parse_weekday("monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Sun").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn test_serde_round_trip_keeps_state() {
        let mut cal = AvailabilityCalendar::new("v1");
        cal.toggle_blocked(date(2025, 8, 15));
        let json = serde_json::to_value(&cal).unwrap();
        let back: AvailabilityCalendar = serde_json::from_value(json).unwrap();
        assert_eq!(back, cal);
    }

    proptest! {
        #[test]
        fn toggle_twice_restores_blocked_state(offset in 0i64..3650, pre_block in any::<bool>()) {
            let d = date(2020, 1, 1) + chrono::Duration::days(offset);
            let mut cal = AvailabilityCalendar::new("v1");
            if pre_block {
                cal.toggle_blocked(d);
            }
            let before = cal.is_blocked(d);
            cal.toggle_blocked(d);
            cal.toggle_blocked(d);
            prop_assert_eq!(cal.is_blocked(d), before);
        }
    }
}
