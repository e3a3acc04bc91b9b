use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::schedule::plan::{PlanRow, Upcoming};
use crate::schedule::secretary::SecretaryBuff;
use crate::slot_swap::SwapState;
use crate::time_grid::{format_duration, weekday_name, TimeContext};

/// Everything shown by the overview, resolved once
#[derive(Debug, Clone)]
pub struct Overview<'a> {
    pub ctx: &'a TimeContext,
    pub swap: SwapState,
    /// Booked secretary turn, shown until it ends
    pub secretary: Option<SecretaryBuff>,
    pub plan: &'a [PlanRow],
    pub upcoming: &'a Upcoming,
}

fn swap_line(ctx: &TimeContext, swap: &SwapState) -> String {
    match swap {
        SwapState::SwapActive(swap) => format!(
            "Slot swap: {} <-> {} until {}",
            swap.from_slot,
            swap.to_slot,
            ctx.format_local(&swap.expires_at(ctx.server_zone))
        ),
        SwapState::NoSwap => format!("Slot swap: available (current slot {})", ctx.current_slot),
    }
}

fn plan_line(row: &PlanRow) -> String {
    let marker = if row.is_current { ">" } else { " " };
    let mut line = format!(
        "{} {:<9} Slot {} {}-{}  {:<4} {}",
        marker,
        weekday_name(row.day),
        row.slot,
        row.local_start,
        row.local_end,
        row.multiplier.to_string(),
        row.event
    );
    if !row.duel_overlaps.is_empty() {
        line.push_str(&format!(" (VS: {})", row.duel_overlaps.join(", ")));
    }
    if !row.special_events.is_empty() {
        line.push_str(&format!(" | Special: {}", row.special_events.join(", ")));
    }
    if !row.tasks.is_empty() {
        let ending = if row.tasks_ending { " [ending]" } else { "" };
        line.push_str(&format!(" | Tasks: {}{}", row.tasks.join(", "), ending));
    }
    line
}

/// Renders the overview as plain text lines
pub fn render_overview(overview: &Overview) -> Vec<String> {
    let ctx = overview.ctx;
    let mut lines = vec![
        format!("Local time:  {} ({})", ctx.local_clock(), ctx.user_zone.label()),
        format!(
            "Server time: {} {} ({})",
            ctx.day_name(),
            ctx.server_clock(),
            ctx.server_zone.label()
        ),
        format!(
            "Slot {} ends in {} | daily reset in {}",
            ctx.current_slot,
            format_duration(ctx.time_until_slot_end().num_minutes()),
            format_duration(ctx.time_until_reset().num_minutes())
        ),
        swap_line(ctx, &overview.swap),
    ];

    if let Some(countdown) = overview.secretary.and_then(|buff| buff.countdown(ctx)) {
        lines.push(format!("Secretary: {}", countdown));
    }

    if let Some(double) = &overview.upcoming.next_double {
        lines.push(format!(
            "Next 2x: {} + {} {}",
            double.event,
            double.duel_events.join(", "),
            double.label
        ));
    }
    if let Some(drone) = &overview.upcoming.next_drone {
        lines.push(format!("Next drone: {} {}", drone.event, drone.label));
    }

    lines.push(String::new());
    lines.push("Next 24 hours:".to_string());
    lines.extend(overview.plan.iter().map(plan_line));
    lines
}

pub fn print_overview(overview: &Overview) {
    for line in render_overview(overview) {
        println!("{}", line);
    }
}

/// Writes the overview to a text file
pub fn write_plan_to_file(overview: &Overview, path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    for line in render_overview(overview) {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::plan::{build_plan, PlanInputs};
    use crate::schedule::{RotationEntry, WeeklySchedule};
    use crate::schedule::secretary::Secretary;
    use crate::slot_swap::SlotSwap;
    use crate::time_grid::{resolve, DisplayFormat, ServerZone, Slot};
    use chrono::{NaiveDate, Utc, Weekday};

    fn ctx() -> TimeContext {
        let zone = ServerZone::default();
        let naive = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap().and_hms_opt(9, 30, 0).unwrap();
        resolve(zone.at(naive).with_timezone(&Utc), zone, zone.into(), DisplayFormat::default())
    }

    fn schedule() -> WeeklySchedule {
        WeeklySchedule {
            rotation: vec![RotationEntry {
                day: Weekday::Thu,
                slot: Slot::new(3).unwrap(),
                event: "Drone Boost".to_string(),
                task: "Stamina".to_string(),
                points: "Standard".to_string(),
            }],
            duel: Vec::new(),
        }
    }

    #[test]
    fn overview_shows_clocks_swap_and_plan() {
        let ctx = ctx();
        let schedule = schedule();
        let inputs = PlanInputs { schedule: &schedule, swap: None, special_events: &[], tasks: &[] };
        let plan = build_plan(&ctx, &inputs);
        let upcoming = Upcoming::default();
        let swap = SwapState::SwapActive(SlotSwap {
            date: ctx.server_date(),
            from_slot: Slot::new(3).unwrap(),
            to_slot: Slot::new(5).unwrap(),
        });

        let lines = render_overview(&Overview { ctx: &ctx, swap, secretary: None, plan: &plan, upcoming: &upcoming });
        assert_eq!(lines[0], "Local time:  09:30 (UTC-2)");
        assert_eq!(lines[1], "Server time: Thursday 09:30 (UTC-2)");
        assert_eq!(lines[2], "Slot 3 ends in 2h 30m | daily reset in 16h 30m");
        assert_eq!(lines[3], "Slot swap: 3 <-> 5 until 02:00");
        assert!(lines.iter().any(|l| l.starts_with("> Thursday  Slot 3 08:00-12:00") && l.ends_with("Drone Boost")));
        assert_eq!(lines.len(), 4 + 2 + 6);
    }

    #[test]
    fn secretary_countdown_follows_the_swap_line() {
        let ctx = ctx();
        let schedule = schedule();
        let inputs = PlanInputs { schedule: &schedule, swap: None, special_events: &[], tasks: &[] };
        let plan = build_plan(&ctx, &inputs);
        let upcoming = Upcoming::default();

        let booked = SecretaryBuff::after_queue(Secretary::Science, &ctx, 2);
        let overview = Overview { ctx: &ctx, swap: SwapState::NoSwap, secretary: Some(booked), plan: &plan, upcoming: &upcoming };
        let lines = render_overview(&overview);
        assert_eq!(lines[4], "Secretary: 🔬 Science starts 09:40");
        assert_eq!(lines.len(), 5 + 2 + 6);

        // an ended turn is not shown
        let ended = SecretaryBuff::starting_at(Secretary::Science, ctx.now_utc - chrono::Duration::minutes(5));
        let overview = Overview { secretary: Some(ended), ..overview };
        assert!(!render_overview(&overview).iter().any(|l| l.starts_with("Secretary:")));
    }

    #[test]
    fn writes_the_same_lines_to_a_file() {
        let ctx = ctx();
        let schedule = schedule();
        let inputs = PlanInputs { schedule: &schedule, swap: None, special_events: &[], tasks: &[] };
        let plan = build_plan(&ctx, &inputs);
        let upcoming = Upcoming::default();
        let overview = Overview { ctx: &ctx, swap: SwapState::NoSwap, secretary: None, plan: &plan, upcoming: &upcoming };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.txt");
        write_plan_to_file(&overview, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), render_overview(&overview).len());
        assert!(written.contains("Slot swap: available (current slot 3)"));
    }
}
