use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::{Reader, ReaderBuilder, StringRecord, WriterBuilder};
use tracing::debug;

use crate::schedule::{ActiveTask, DuelEntry, Frequency, RotationEntry, SpecialEvent, TaskTemplate, WeeklySchedule};
use crate::time_grid::{parse_time_to_minutes, parse_weekday, weekday_name, Slot, WEEK_DAYS};

pub const ROTATION_TYPE: &str = "Arms Race";
pub const DUEL_TYPE: &str = "VS";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),
    #[error("{file} has no `{column}` column")]
    MissingColumn { file: String, column: String },
    #[error("{file} line {line}: {reason}")]
    InvalidRow { file: String, line: u64, reason: String },
}

/// Column positions looked up by header name
struct Columns {
    file: String,
    headers: StringRecord,
}

impl Columns {
    fn require(&self, name: &str) -> Result<usize, LoadError> {
        self.optional(name).ok_or_else(|| LoadError::MissingColumn {
            file: self.file.clone(),
            column: name.to_string(),
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    fn invalid(&self, record: &StringRecord, reason: String) -> LoadError {
        LoadError::InvalidRow {
            file: self.file.clone(),
            line: record.position().map(|p| p.line()).unwrap_or(0),
            reason,
        }
    }
}

fn field(record: &StringRecord, col: usize) -> &str {
    record.get(col).unwrap_or("").trim()
}

/// Parses a number, returning 0 if empty or invalid
fn parse_number(value: &str) -> u32 {
    value.trim().parse().unwrap_or(0)
}

/// Opens a tab-separated table; a missing file is not an error
fn open_table(path: &Path) -> Result<Option<(Reader<File>, Columns)>, LoadError> {
    if !path.exists() {
        debug!(path = %path.display(), "table missing, loading empty");
        return Ok(None);
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = Columns {
        file: path.display().to_string(),
        headers,
    };
    Ok(Some((reader, columns)))
}

fn tab_writer(path: &Path) -> Result<csv::Writer<File>, LoadError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| LoadError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    Ok(WriterBuilder::new().delimiter(b'\t').from_path(path)?)
}

fn parse_day(columns: &Columns, record: &StringRecord, col: usize) -> Result<chrono::Weekday, LoadError> {
    let value = field(record, col);
    parse_weekday(value).ok_or_else(|| columns.invalid(record, format!("unknown day `{}`", value)))
}

/// True when the row's optional `Type` column names another table
fn other_type(record: &StringRecord, type_col: Option<usize>, wanted: &str) -> bool {
    type_col
        .map(|col| field(record, col))
        .is_some_and(|kind| !kind.is_empty() && !kind.eq_ignore_ascii_case(wanted))
}

/// Loads the rotation and duel tables
pub fn load_weekly_schedule(rotation_path: &Path, duel_path: &Path) -> Result<WeeklySchedule, LoadError> {
    Ok(WeeklySchedule {
        rotation: load_rotation(rotation_path)?,
        duel: load_duel(duel_path)?,
    })
}

/// Loads both tables from one file whose `Type` column tells rotation rows
/// from duel rows
pub fn load_combined_schedule(path: &Path) -> Result<WeeklySchedule, LoadError> {
    Ok(WeeklySchedule {
        rotation: load_rotation(path)?,
        duel: load_duel(path)?,
    })
}

/// Loads the split tables, falling back to the combined table when either
/// split file is missing
pub fn load_schedule(rotation_path: &Path, duel_path: &Path, combined_path: &Path) -> Result<WeeklySchedule, LoadError> {
    if rotation_path.exists() && duel_path.exists() {
        return load_weekly_schedule(rotation_path, duel_path);
    }
    if combined_path.exists() {
        debug!(path = %combined_path.display(), "split tables missing, using combined table");
        return load_combined_schedule(combined_path);
    }
    load_weekly_schedule(rotation_path, duel_path)
}

pub fn load_rotation(path: &Path) -> Result<Vec<RotationEntry>, LoadError> {
    let Some((mut reader, columns)) = open_table(path)? else {
        return Ok(Vec::new());
    };

    let day_col = columns.require("Day")?;
    let event_col = columns.require("Event")?;
    let task_col = columns.require("Task")?;
    let points_col = columns.require("Points")?;
    let slot_col = columns.require("Slot")?;
    let type_col = columns.optional("Type");

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result?;

        // Combined tables carry duel rows too
        if other_type(&record, type_col, ROTATION_TYPE) {
            continue;
        }

        let day = parse_day(&columns, &record, day_col)?;
        let slot_value = field(&record, slot_col);
        let slot: Slot = slot_value
            .parse()
            .map_err(|_| columns.invalid(&record, format!("slot `{}` is not 1-6", slot_value)))?;

        entries.push(RotationEntry {
            day,
            slot,
            event: field(&record, event_col).to_string(),
            task: field(&record, task_col).to_string(),
            points: field(&record, points_col).to_string(),
        });
    }

    debug!(rows = entries.len(), path = %path.display(), "loaded rotation");
    Ok(entries)
}

pub fn load_duel(path: &Path) -> Result<Vec<DuelEntry>, LoadError> {
    let Some((mut reader, columns)) = open_table(path)? else {
        return Ok(Vec::new());
    };

    let day_col = columns.require("Day")?;
    let event_col = columns.require("Event")?;
    let task_col = columns.require("Task")?;
    let points_col = columns.require("Points")?;
    let type_col = columns.optional("Type");

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result?;
        if other_type(&record, type_col, DUEL_TYPE) {
            continue;
        }
        entries.push(DuelEntry {
            day: parse_day(&columns, &record, day_col)?,
            event: field(&record, event_col).to_string(),
            task: field(&record, task_col).to_string(),
            points: field(&record, points_col).to_string(),
        });
    }

    debug!(rows = entries.len(), path = %path.display(), "loaded duel");
    Ok(entries)
}

/// Writes the rotation table back, ordered by day then slot
pub fn save_rotation(path: &Path, schedule: &WeeklySchedule) -> Result<(), LoadError> {
    let mut sorted = schedule.clone();
    sorted.sort_rotation();

    let mut wtr = tab_writer(path)?;
    wtr.write_record(["Day", "Event", "Task", "Points", "Slot", "Type"])?;
    for entry in &sorted.rotation {
        let slot = entry.slot.to_string();
        wtr.write_record([
            weekday_name(entry.day),
            entry.event.as_str(),
            entry.task.as_str(),
            entry.points.as_str(),
            slot.as_str(),
            ROTATION_TYPE,
        ])?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Writes the duel table back in weekday order
pub fn save_duel(path: &Path, schedule: &WeeklySchedule) -> Result<(), LoadError> {
    let mut wtr = tab_writer(path)?;
    wtr.write_record(["Day", "Event", "Task", "Points"])?;
    for day in WEEK_DAYS {
        for entry in schedule.duel.iter().filter(|e| e.day == day) {
            wtr.write_record([weekday_name(entry.day), entry.event.as_str(), entry.task.as_str(), entry.points.as_str()])?;
        }
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn load_special_events(path: &Path) -> Result<Vec<SpecialEvent>, LoadError> {
    let Some((mut reader, columns)) = open_table(path)? else {
        return Ok(Vec::new());
    };

    let name_col = columns.require("name")?;
    let days_col = columns.require("days")?;
    let freq_col = columns.require("freq")?;
    let ref_col = columns.optional("ref_week");
    let start_col = columns.require("start_time")?;
    let end_col = columns.require("end_time")?;

    let mut events = Vec::new();
    for result in reader.records() {
        let record = result?;

        let days = field(&record, days_col)
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| parse_weekday(d).ok_or_else(|| columns.invalid(&record, format!("unknown day `{}`", d))))
            .collect::<Result<Vec<_>, _>>()?;

        let frequency = match field(&record, freq_col).to_lowercase().as_str() {
            "weekly" => Frequency::Weekly,
            "biweekly" => Frequency::Biweekly,
            other => return Err(columns.invalid(&record, format!("unknown frequency `{}`", other))),
        };

        let time = |col: usize| {
            let value = field(&record, col);
            parse_time_to_minutes(value).ok_or_else(|| columns.invalid(&record, format!("bad time `{}`", value)))
        };

        events.push(SpecialEvent {
            name: field(&record, name_col).to_string(),
            days,
            frequency,
            ref_week: ref_col.map(|col| parse_number(field(&record, col))).unwrap_or(0),
            start_minutes: time(start_col)?,
            end_minutes: time(end_col)?,
        });
    }

    Ok(events)
}

pub fn load_task_templates(path: &Path) -> Result<Vec<TaskTemplate>, LoadError> {
    let Some((mut reader, columns)) = open_table(path)? else {
        return Ok(Vec::new());
    };

    let name_col = columns.require("name")?;
    let number = |record: &StringRecord, name: &str| columns.optional(name).map(|col| parse_number(field(record, col))).unwrap_or(0);
    let category_col = columns.optional("category");

    let mut templates = Vec::new();
    for result in reader.records() {
        let record = result?;
        let name = field(&record, name_col);
        if name.is_empty() {
            continue;
        }

        templates.push(TaskTemplate {
            name: name.to_string(),
            duration_n: number(&record, "duration_n"),
            duration_r: number(&record, "duration_r"),
            duration_sr: number(&record, "duration_sr"),
            duration_ssr: number(&record, "duration_ssr"),
            duration_ur: number(&record, "duration_ur"),
            max_daily: number(&record, "max_daily"),
            category: category_col.map(|col| field(&record, col).to_string()).unwrap_or_default(),
        });
    }

    Ok(templates)
}

pub fn load_active_tasks(path: &Path) -> Result<Vec<ActiveTask>, LoadError> {
    let Some((mut reader, columns)) = open_table(path)? else {
        return Ok(Vec::new());
    };

    let id_col = columns.require("task_id")?;
    let name_col = columns.require("task_name")?;
    let start_col = columns.require("start_time_utc")?;
    let duration_col = columns.optional("duration_minutes");
    let end_col = columns.require("end_time_utc")?;
    let status_col = columns.optional("status");

    let mut tasks = Vec::new();
    for result in reader.records() {
        let record = result?;

        let instant = |col: usize| {
            let value = field(&record, col);
            DateTime::parse_from_rfc3339(value)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|err| columns.invalid(&record, format!("bad timestamp `{}`: {}", value, err)))
        };

        tasks.push(ActiveTask {
            task_id: field(&record, id_col).to_string(),
            task_name: field(&record, name_col).to_string(),
            start_time_utc: instant(start_col)?,
            duration_minutes: duration_col.map(|col| parse_number(field(&record, col))).unwrap_or(0),
            end_time_utc: instant(end_col)?,
            status: status_col.map(|col| field(&record, col).to_string()).unwrap_or_default(),
        });
    }

    Ok(tasks)
}

/// Rewrites the active task table; an empty list leaves just the header
pub fn save_active_tasks(path: &Path, tasks: &[ActiveTask]) -> Result<(), LoadError> {
    let mut wtr = tab_writer(path)?;
    wtr.write_record(["task_id", "task_name", "start_time_utc", "duration_minutes", "end_time_utc", "status"])?;
    for task in tasks {
        let duration = task.duration_minutes.to_string();
        let start = task.start_time_utc.to_rfc3339();
        let end = task.end_time_utc.to_rfc3339();
        wtr.write_record([
            task.task_id.as_str(),
            task.task_name.as_str(),
            start.as_str(),
            duration.as_str(),
            end.as_str(),
            task.status.as_str(),
        ])?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Weekday};
    use std::fs;

    fn slot(n: u8) -> Slot {
        Slot::new(n).unwrap()
    }

    #[test]
    fn missing_tables_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = load_weekly_schedule(&dir.path().join("a.csv"), &dir.path().join("b.csv")).unwrap();
        assert_eq!(schedule, WeeklySchedule::default());
        assert!(load_special_events(&dir.path().join("c.csv")).unwrap().is_empty());
        assert!(load_active_tasks(&dir.path().join("d.csv")).unwrap().is_empty());
    }

    #[test]
    fn loads_rotation_and_skips_duel_rows_of_combined_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arms_race_schedule.csv");
        fs::write(
            &path,
            "Day\tEvent\tTask\tPoints\tSlot\tType\n\
             Thursday\tDrone Boost\tUse stamina\t100\t3\tArms Race\n\
             Thursday\tDrone Boost\tDrone parts\t50\t3\tArms Race\n\
             Thursday\tHero Advancement\tRecruit\t2\t0\tVS\n",
        )
        .unwrap();

        let rotation = load_rotation(&path).unwrap();
        assert_eq!(rotation.len(), 2);
        assert_eq!((rotation[0].day, rotation[0].slot), (Weekday::Thu, slot(3)));
        assert_eq!(rotation[1].task, "Drone parts");
    }

    #[test]
    fn falls_back_to_the_combined_table() {
        let dir = tempfile::tempdir().unwrap();
        let rotation_path = dir.path().join("arms_race_schedule.csv");
        let duel_path = dir.path().join("vs_duel_schedule.csv");
        let combined_path = dir.path().join("last_standing_schedule.csv");
        fs::write(
            &combined_path,
            "Day\tType\tSlot\tEvent\tTask\tPoints\n\
             Thursday\tArms Race\t3\tDrone Boost\tUse stamina\t100\n\
             Thursday\tVS\t0\tHero Advancement\tUse Hero EXP\t2\n",
        )
        .unwrap();

        let schedule = load_schedule(&rotation_path, &duel_path, &combined_path).unwrap();
        assert_eq!(schedule.rotation.len(), 1);
        assert_eq!(schedule.rotation[0].event, "Drone Boost");
        assert_eq!(schedule.duel.len(), 1);
        assert_eq!((schedule.duel[0].day, schedule.duel[0].event.as_str()), (Weekday::Thu, "Hero Advancement"));

        // once both split tables exist they win
        fs::write(&rotation_path, "Day\tEvent\tTask\tPoints\tSlot\nFriday\tTech Research\tResearch\t100\t1\n").unwrap();
        fs::write(&duel_path, "Day\tEvent\tTask\tPoints\n").unwrap();
        let schedule = load_schedule(&rotation_path, &duel_path, &combined_path).unwrap();
        assert_eq!(schedule.rotation[0].event, "Tech Research");
        assert!(schedule.duel.is_empty());
    }

    #[test]
    fn rejects_out_of_range_slot_with_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arms_race_schedule.csv");
        fs::write(&path, "Day\tEvent\tTask\tPoints\tSlot\nMonday\tTech\tResearch\t1\t7\n").unwrap();

        match load_rotation(&path) {
            Err(LoadError::InvalidRow { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert!(reason.contains('7'));
            }
            other => panic!("expected invalid row, got {:?}", other),
        }
    }

    #[test]
    fn saved_rotation_reads_back_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arms_race_schedule.csv");
        let mut schedule = WeeklySchedule::default();
        let events: crate::time_grid::SlotMap<String> = Slot::all().map(|s| (s, format!("Event {}", s))).collect();
        schedule.set_rotation_day(Weekday::Fri, &events);
        schedule.set_rotation_day(Weekday::Mon, &events);

        save_rotation(&path, &schedule).unwrap();
        let loaded = load_rotation(&path).unwrap();
        assert_eq!(loaded.len(), 12);
        assert_eq!(loaded[0].day, Weekday::Mon);
        assert_eq!(loaded[11].event, "Event 6");
    }

    #[test]
    fn loads_special_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("special_events.csv");
        fs::write(
            &path,
            "name\tdays\tfreq\tref_week\tstart_time\tend_time\n\
             Marshal Guard\tMon, Thu\tbiweekly\t6\t21:00\t01:00\n",
        )
        .unwrap();

        let events = load_special_events(&path).unwrap();
        assert_eq!(events[0].days, vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(events[0].frequency, Frequency::Biweekly);
        assert_eq!((events[0].start_minutes, events[0].end_minutes), (21 * 60, 60));
    }

    #[test]
    fn active_tasks_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active_daily_tasks.csv");
        let start = Utc.with_ymd_and_hms(2026, 2, 5, 11, 30, 0).unwrap();
        let task = ActiveTask {
            task_id: "Trucks_1770291000".to_string(),
            task_name: "Trucks (UR)".to_string(),
            start_time_utc: start,
            duration_minutes: 60,
            end_time_utc: start + Duration::minutes(60),
            status: "active".to_string(),
        };

        save_active_tasks(&path, &[task.clone()]).unwrap();
        assert_eq!(load_active_tasks(&path).unwrap(), vec![task]);

        save_active_tasks(&path, &[]).unwrap();
        assert!(load_active_tasks(&path).unwrap().is_empty());
    }

    #[test]
    fn templates_default_missing_numbers_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_task_templates.csv");
        fs::write(&path, "name\tduration_r\tduration_ur\tmax_daily\tcategory\nTrucks\t20\t60\t4\tLogistics\n").unwrap();

        let templates = load_task_templates(&path).unwrap();
        assert_eq!(templates[0].duration_n, 0);
        assert_eq!(templates[0].duration_ur, 60);
        assert_eq!(templates[0].max_daily, 4);
    }
}
