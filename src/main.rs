use std::path::Path;

use chrono::Weekday;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slot_planner::config::PlannerConfig;
use slot_planner::display::{print_overview, write_plan_to_file, Overview};
use slot_planner::parser::{
    load_active_tasks, load_schedule, load_special_events, load_task_templates, save_active_tasks, save_duel,
    save_rotation,
};
use slot_planner::schedule::plan::{build_plan, scan_upcoming, PlanInputs, SCAN_WINDOWS};
use slot_planner::schedule::secretary::{Secretary, SecretaryBuff, SecretaryStore};
use slot_planner::schedule::speedups::{parse_duration, Activity, SpeedupPlan, SpeedupPool};
use slot_planner::schedule::tasks::{cleanup_expired, complete_task, daily_activation_count, find_template, Rarity};
use slot_planner::slot_swap::{JsonFileStore, SlotSwapController};
use slot_planner::time_grid::{parse_time_to_minutes, parse_weekday, weekday_name, Slot, SlotMap, TimeContext};

const USAGE: &str = "usage: slot-planner <command>

commands:
  overview                                 show clocks, swap status and the next 24 hours (default)
  plan-file <path>                         write the overview to a file
  swap <slot>                              swap the current slot with <slot> until the daily reset
  cancel-swap                              drop today's swap
  activate <template> <rarity>             start a timed task (rarity N, R, SR, SSR or UR)
  complete <task_id>                       remove a running task
  set-rotation <day> <e1> .. <e6>          replace one weekday's rotation events
  secretary <type> at <HH:MM>              book a secretary turn at a server time
  secretary <type> queue <people>          book a secretary turn behind <people> others
  clear-secretary                          drop the booked secretary turn
  speedups <activity> <base> <general> [typed]
                                           speed-up coverage; counts are 8h,1h,15m,5m,1m";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::from_env()?;
    let ctx = config.time_context();
    let mut controller = SlotSwapController::new(JsonFileStore::new(config.swap_file()));

    let args: Vec<String> = std::env::args().collect();
    let arg = |i: usize| args.get(i).map(String::as_str).ok_or(USAGE);

    match args.get(1).map(String::as_str) {
        None | Some("overview") => {
            show_overview(&config, &ctx, &mut controller, None)?;
        }
        Some("plan-file") => {
            let path = arg(2)?;
            show_overview(&config, &ctx, &mut controller, Some(Path::new(path)))?;
            println!("Plan saved to {}", path);
        }
        Some("swap") => {
            let target: Slot = arg(2)?.parse()?;
            let swap = controller.request_swap(&ctx, ctx.current_slot, target)?;
            println!(
                "Swapped slot {} with slot {} until {}",
                swap.from_slot,
                swap.to_slot,
                ctx.format_local(&swap.expires_at(ctx.server_zone))
            );
        }
        Some("cancel-swap") => {
            controller.cancel_swap();
            println!("Slot swap cancelled");
        }
        Some("activate") => {
            let rarity: Rarity = arg(3)?.parse()?;
            activate_task(&config, &ctx, arg(2)?, rarity)?;
        }
        Some("complete") => {
            let path = config.active_tasks_file();
            let mut tasks = load_active_tasks(&path)?;
            let done = complete_task(&mut tasks, arg(2)?)?;
            save_active_tasks(&path, &tasks)?;
            println!("Completed {}", done.task_name);
        }
        Some("set-rotation") => {
            let day = parse_weekday(arg(2)?).ok_or("day must be a weekday name")?;
            set_rotation(&config, day, args.get(3..).unwrap_or(&[]))?;
        }
        Some("secretary") => {
            let secretary: Secretary = arg(2)?.parse()?;
            let buff = match arg(3)? {
                "at" => {
                    let minutes = parse_time_to_minutes(arg(4)?).ok_or("time must be HH:MM")?;
                    SecretaryBuff::at_server_time(secretary, &ctx, minutes / 60, minutes % 60).ok_or(USAGE)?
                }
                "queue" => SecretaryBuff::after_queue(secretary, &ctx, arg(4)?.parse()?),
                _ => return Err(USAGE.into()),
            };
            SecretaryStore::new(config.secretary_file()).save(&buff)?;
            let bonuses: Vec<String> = secretary
                .bonuses()
                .iter()
                .map(|(name, amount)| format!("{} {}", name, amount))
                .collect();
            println!(
                "{} {} set: {} - {} (server {})",
                secretary.icon(),
                secretary,
                ctx.format_local(&buff.start_time_utc),
                ctx.format_local(&buff.end_time_utc),
                ctx.format_server(&buff.start_time_utc)
            );
            println!("  {}", bonuses.join(", "));
        }
        Some("clear-secretary") => {
            SecretaryStore::new(config.secretary_file()).clear()?;
            println!("Secretary turn cleared");
        }
        Some("speedups") => {
            let activity: Activity = arg(2)?.parse()?;
            let base = parse_duration(arg(3)?)?;
            let general: SpeedupPool = arg(4)?.parse()?;
            let typed: SpeedupPool = match args.get(5) {
                Some(counts) => counts.parse()?,
                None => SpeedupPool::default(),
            };
            for line in SpeedupPlan::compute(activity, base, &general, &typed).summary_lines() {
                println!("{}", line);
            }
        }
        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn activate_task(
    config: &PlannerConfig,
    ctx: &TimeContext,
    name: &str,
    rarity: Rarity,
) -> Result<(), Box<dyn std::error::Error>> {
    let templates = load_task_templates(&config.task_templates_file())?;
    let template = find_template(&templates, name)?;

    let path = config.active_tasks_file();
    let mut tasks = cleanup_expired(load_active_tasks(&path)?, ctx.now_utc);
    let used = daily_activation_count(&tasks, &template.name, ctx);
    let task = template.activate(rarity, ctx, used)?;
    println!(
        "Started {} until {} ({} of {} today)",
        task.task_name,
        ctx.format_local(&task.end_time_utc),
        used + 1,
        template.max_daily
    );
    tasks.push(task);
    save_active_tasks(&path, &tasks)?;
    Ok(())
}

fn set_rotation(config: &PlannerConfig, day: Weekday, events: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if events.len() != usize::from(Slot::COUNT) {
        return Err(format!("set-rotation needs {} events, got {}", Slot::COUNT, events.len()).into());
    }
    let by_slot: SlotMap<String> = Slot::all().zip(events.iter().cloned()).collect();

    let rotation_path = config.rotation_file();
    let duel_path = config.duel_file();
    let mut schedule = load_schedule(&rotation_path, &duel_path, &config.combined_schedule_file())?;
    schedule.set_rotation_day(day, &by_slot);
    save_rotation(&rotation_path, &schedule)?;
    // Edits land in the split tables, so a combined-only layout is split here
    if !duel_path.exists() {
        save_duel(&duel_path, &schedule)?;
    }
    info!(day = weekday_name(day), "rotation updated");
    println!("Updated {} rotation", weekday_name(day));
    Ok(())
}

fn show_overview(
    config: &PlannerConfig,
    ctx: &TimeContext,
    controller: &mut SlotSwapController<JsonFileStore>,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = load_schedule(&config.rotation_file(), &config.duel_file(), &config.combined_schedule_file())?;
    let special_events = load_special_events(&config.special_events_file())?;

    // Finished tasks are dropped from disk on every run
    let tasks_path = config.active_tasks_file();
    let loaded = load_active_tasks(&tasks_path)?;
    let before = loaded.len();
    let tasks = cleanup_expired(loaded, ctx.now_utc);
    if tasks.len() != before {
        if let Err(err) = save_active_tasks(&tasks_path, &tasks) {
            warn!(error = %err, "could not rewrite active tasks");
        } else {
            info!(removed = before - tasks.len(), "cleaned up expired tasks");
        }
    }

    let swap = controller.normalize(ctx);
    let secretary = SecretaryStore::new(config.secretary_file()).current(ctx.now_utc);
    let inputs = PlanInputs {
        schedule: &schedule,
        swap: swap.active(),
        special_events: &special_events,
        tasks: &tasks,
    };
    let plan = build_plan(ctx, &inputs);
    let upcoming = scan_upcoming(ctx, &inputs, SCAN_WINDOWS);
    let overview = Overview {
        ctx,
        swap,
        secretary,
        plan: &plan,
        upcoming: &upcoming,
    };

    match file {
        Some(path) => write_plan_to_file(&overview, path)?,
        None => print_overview(&overview),
    }
    Ok(())
}
