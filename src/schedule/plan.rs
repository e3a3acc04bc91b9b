use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc, Weekday};
use tracing::trace;

use super::overlap::{overlapping_duel_events, Multiplier};
use super::special::{self, SpecialEvent};
use super::tasks::{self, ActiveTask};
use super::types::{DaySchedule, WeeklySchedule};
use crate::slot_swap::SlotSwap;
use crate::time_grid::{format_relative, Slot, TimeContext, SLOT_HOURS};

pub const PLAN_WINDOWS: usize = 6;
pub const SCAN_WINDOWS: usize = 48;

/// Everything the plan reads besides the clock
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs<'a> {
    pub schedule: &'a WeeklySchedule,
    /// The active swap, if any, as reported by the controller
    pub swap: Option<SlotSwap>,
    pub special_events: &'a [SpecialEvent],
    pub tasks: &'a [ActiveTask],
}

impl PlanInputs<'_> {
    /// Schedule of the server day holding `window_start`, with the swap
    /// applied when it belongs to that date
    pub fn day_at(&self, window_start: &DateTime<FixedOffset>) -> DaySchedule {
        let mut day = self.schedule.day(window_start.weekday());
        if let Some(swap) = self.swap {
            if swap.date == window_start.date_naive() {
                day.apply_swap(&swap);
            }
        }
        day
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub window_start: DateTime<FixedOffset>,
    pub day: Weekday,
    pub slot: Slot,
    pub local_start: String,
    pub local_end: String,
    pub event: String,
    pub duel_overlaps: Vec<String>,
    pub special_events: Vec<String>,
    pub tasks: Vec<String>,
    pub tasks_ending: bool,
    pub multiplier: Multiplier,
    pub is_current: bool,
}

fn window_end(start: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    *start + Duration::hours(i64::from(SLOT_HOURS))
}

/// The next six windows, starting with the active one
pub fn build_plan(ctx: &TimeContext, inputs: &PlanInputs) -> Vec<PlanRow> {
    ctx.window_starts(PLAN_WINDOWS)
        .into_iter()
        .map(|start| {
            let end = window_end(&start);
            let slot = Slot::from_hour(start.hour());
            let day = inputs.day_at(&start);
            let rotation = day.rotation.get(&slot).map(Vec::as_slice).unwrap_or(&[]);
            let duel_overlaps = overlapping_duel_events(rotation, &day.duel);

            let start_utc = start.with_timezone(&Utc);
            let end_utc = end.with_timezone(&Utc);
            let active = tasks::active_in_window(inputs.tasks, start_utc, end_utc);

            trace!(%start, slot = %slot, "plan window");
            PlanRow {
                window_start: start,
                day: day.day,
                slot,
                local_start: ctx.format_local(&start),
                local_end: ctx.format_local(&end),
                event: day.rotation_event(slot).unwrap_or("N/A").to_string(),
                multiplier: Multiplier::for_slot(rotation, &day.duel),
                duel_overlaps,
                special_events: special::active_in_window(inputs.special_events, start),
                tasks: tasks::group_by_base_name(&active),
                tasks_ending: tasks::has_ending_in_window(inputs.tasks, start_utc, end_utc),
                is_current: start == ctx.active_start,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingWindow {
    pub event: String,
    /// Duel events scoring alongside, empty for plain rotation hits
    pub duel_events: Vec<String>,
    pub start: DateTime<FixedOffset>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upcoming {
    pub next_double: Option<UpcomingWindow>,
    pub next_drone: Option<UpcomingWindow>,
}

/// Scans `windows` slot windows from the active one for the first
/// double-value window and the first drone window
pub fn scan_upcoming(ctx: &TimeContext, inputs: &PlanInputs, windows: usize) -> Upcoming {
    let mut upcoming = Upcoming::default();

    for start in ctx.window_starts(windows) {
        if upcoming.next_double.is_some() && upcoming.next_drone.is_some() {
            break;
        }

        let slot = Slot::from_hour(start.hour());
        let day = inputs.day_at(&start);
        let Some(rotation) = day.rotation.get(&slot).filter(|rows| !rows.is_empty()) else {
            continue;
        };
        let event = rotation[0].event.clone();
        let label = format_relative(start - ctx.now_server);

        if upcoming.next_double.is_none() {
            let duel_events = overlapping_duel_events(rotation, &day.duel);
            if !duel_events.is_empty() {
                upcoming.next_double = Some(UpcomingWindow {
                    event: event.clone(),
                    duel_events,
                    start,
                    label: label.clone(),
                });
            }
        }

        if upcoming.next_drone.is_none() && event.contains("Drone") {
            upcoming.next_drone = Some(UpcomingWindow {
                event,
                duel_events: Vec::new(),
                start,
                label,
            });
        }
    }

    upcoming
}
