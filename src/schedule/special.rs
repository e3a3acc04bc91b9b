use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Weekday};

use crate::time_grid::SLOT_HOURS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    /// Every other ISO week, in step with `ref_week`
    Biweekly,
}

/// A recurring timed event outside the rotation, e.g. a weekly boss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialEvent {
    pub name: String,
    pub days: Vec<Weekday>,
    pub frequency: Frequency,
    pub ref_week: u32,
    /// Minutes since midnight, in the same frame as the windows checked against
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl SpecialEvent {
    /// Checks if the event overlaps the 4-hour window starting at `window_start`.
    ///
    /// The event is placed on the window's calendar date; an end at or before
    /// the start wraps past midnight.
    pub fn is_in_window(&self, window_start: DateTime<FixedOffset>) -> bool {
        if !self.days.contains(&window_start.weekday()) {
            return false;
        }

        if self.frequency == Frequency::Biweekly
            && window_start.iso_week().week() % 2 != self.ref_week % 2
        {
            return false;
        }

        let base = window_start
            - Duration::seconds(i64::from(window_start.num_seconds_from_midnight()))
            - Duration::nanoseconds(i64::from(window_start.nanosecond()));
        let evt_start = base + Duration::minutes(i64::from(self.start_minutes));
        let mut evt_end = base + Duration::minutes(i64::from(self.end_minutes));
        if evt_end <= evt_start {
            evt_end = evt_end + Duration::days(1);
        }

        let win_end = window_start + Duration::hours(i64::from(SLOT_HOURS));
        evt_start < win_end && evt_end > window_start
    }
}

/// Names of the events running during the window
pub fn active_in_window(events: &[SpecialEvent], window_start: DateTime<FixedOffset>) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.is_in_window(window_start))
        .map(|event| event.name.clone())
        .collect()
}
