use std::fs;

use chrono::{NaiveDate, Utc, Weekday};
use slot_planner::parser::load_weekly_schedule;
use slot_planner::schedule::plan::{build_plan, PlanInputs};
use slot_planner::slot_swap::{InvalidSwap, JsonFileStore, SlotSwapController, SwapStore};
use slot_planner::time_grid::{resolve, DisplayFormat, ServerZone, Slot, SlotMap, TimeContext};

fn slot(n: u8) -> Slot {
    Slot::new(n).unwrap()
}

fn ctx_at(day: u32, h: u32, m: u32, s: u32) -> TimeContext {
    let zone = ServerZone::default();
    let naive = NaiveDate::from_ymd_opt(2026, 2, day).unwrap().and_hms_opt(h, m, s).unwrap();
    resolve(zone.at(naive).with_timezone(&Utc), zone, zone.into(), DisplayFormat::default())
}

fn write_tables(dir: &std::path::Path) {
    let mut rotation = String::from("Day\tEvent\tTask\tPoints\tSlot\n");
    for (day, prefix) in [("Thursday", "Thu"), ("Friday", "Fri")] {
        for n in 1..=6 {
            rotation.push_str(&format!("{day}\t{prefix} Event {n}\tTask {n}\t100\t{n}\n"));
        }
    }
    fs::write(dir.join("arms_race_schedule.csv"), rotation).unwrap();
    fs::write(
        dir.join("vs_duel_schedule.csv"),
        "Day\tEvent\tTask\tPoints\nThursday\tHero Advancement\tUse Hero EXP\t2\n",
    )
    .unwrap();
}

#[test]
fn thursday_swap_lasts_until_friday_reset() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let schedule = load_weekly_schedule(
        &dir.path().join("arms_race_schedule.csv"),
        &dir.path().join("vs_duel_schedule.csv"),
    )
    .unwrap();
    let thursday = schedule.day(Weekday::Thu);
    let swap_date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
    let swap_path = dir.path().join("daily_slot_swap.json");

    let created = ctx_at(5, 9, 30, 0);
    assert_eq!((created.current_slot, created.day_label), (slot(3), Weekday::Thu));

    let mut controller = SlotSwapController::new(JsonFileStore::new(&swap_path));
    controller.request_swap(&created, slot(3), slot(5)).unwrap();

    let record: serde_json::Value = serde_json::from_str(&fs::read_to_string(&swap_path).unwrap()).unwrap();
    assert_eq!(record, serde_json::json!({"date": "2026-02-05", "from_slot": 3, "to_slot": 5}));

    // swapped on the day itself, other slots and the duel untouched
    let effective = controller.effective_day(&thursday, swap_date, &created);
    assert_eq!(effective.rotation_event(slot(3)), Some("Thu Event 5"));
    assert_eq!(effective.rotation_event(slot(5)), Some("Thu Event 3"));
    for n in [1, 2, 4, 6] {
        assert_eq!(effective.rotation[&slot(n)], thursday.rotation[&slot(n)]);
    }
    assert_eq!(effective.duel, thursday.duel);

    // a fresh controller over the same file still sees it after midnight
    let mut reopened = SlotSwapController::new(JsonFileStore::new(&swap_path));
    let after_midnight = ctx_at(6, 1, 0, 0);
    assert!(reopened.is_swap_valid(&after_midnight));
    let base: SlotMap<String> = thursday
        .rotation
        .iter()
        .map(|(s, rows)| (*s, rows[0].event.clone()))
        .collect();
    assert_eq!(reopened.effective_schedule(&base, &after_midnight)[&slot(3)], "Thu Event 5");

    // after the reset the unswapped order is back and the record is gone
    let after_reset = ctx_at(6, 3, 0, 0);
    assert_eq!(reopened.effective_schedule(&base, &after_reset), base);
    assert!(!swap_path.exists());
    assert!(reopened.can_swap_today(&after_reset));
}

#[test]
fn plan_applies_the_swap_to_its_own_date_only() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let schedule = load_weekly_schedule(
        &dir.path().join("arms_race_schedule.csv"),
        &dir.path().join("vs_duel_schedule.csv"),
    )
    .unwrap();

    let ctx = ctx_at(5, 9, 30, 0);
    let mut controller = SlotSwapController::new(JsonFileStore::new(dir.path().join("daily_slot_swap.json")));
    controller.request_swap(&ctx, slot(3), slot(5)).unwrap();

    let inputs = PlanInputs {
        schedule: &schedule,
        swap: controller.active_swap(&ctx),
        special_events: &[],
        tasks: &[],
    };
    let events: Vec<String> = build_plan(&ctx, &inputs).into_iter().map(|row| row.event).collect();
    assert_eq!(
        events,
        vec!["Thu Event 5", "Thu Event 4", "Thu Event 3", "Thu Event 6", "Fri Event 1", "Fri Event 2"]
    );
}

#[test]
fn rejected_requests_leave_the_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let swap_path = dir.path().join("daily_slot_swap.json");
    let ctx = ctx_at(5, 9, 30, 0);
    let mut controller = SlotSwapController::new(JsonFileStore::new(&swap_path));

    assert_eq!(controller.request_swap(&ctx, slot(3), slot(3)), Err(InvalidSwap::SameSlot(slot(3))));
    assert!(!swap_path.exists());

    controller.request_swap(&ctx, slot(3), slot(1)).unwrap();
    let before = fs::read_to_string(&swap_path).unwrap();
    assert!(controller.request_swap(&ctx, slot(3), slot(6)).is_err());
    assert_eq!(fs::read_to_string(&swap_path).unwrap(), before);

    controller.cancel_swap();
    controller.cancel_swap();
    assert!(controller.store().load().unwrap().is_none());
}

#[test]
fn unreadable_record_reads_as_no_swap() {
    let dir = tempfile::tempdir().unwrap();
    let swap_path = dir.path().join("daily_slot_swap.json");
    fs::write(&swap_path, "{ not json").unwrap();

    let ctx = ctx_at(5, 9, 30, 0);
    let mut controller = SlotSwapController::new(JsonFileStore::new(&swap_path));
    assert!(controller.can_swap_today(&ctx));

    // a new request replaces the corrupt file
    controller.request_swap(&ctx, slot(3), slot(2)).unwrap();
    assert!(controller.is_swap_valid(&ctx));
}

#[test]
fn record_with_equal_slots_does_not_block_the_day() {
    let dir = tempfile::tempdir().unwrap();
    let swap_path = dir.path().join("daily_slot_swap.json");
    fs::write(&swap_path, r#"{"date":"2026-02-05","from_slot":3,"to_slot":3}"#).unwrap();

    let ctx = ctx_at(5, 9, 30, 0);
    let mut controller = SlotSwapController::new(JsonFileStore::new(&swap_path));
    assert!(!controller.is_swap_valid(&ctx));

    let swap = controller.request_swap(&ctx, slot(3), slot(5)).unwrap();
    assert_eq!((swap.from_slot, swap.to_slot), (slot(3), slot(5)));
    assert_eq!(controller.store().load().unwrap(), Some(swap));
}
