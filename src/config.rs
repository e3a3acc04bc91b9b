use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::time_grid::{resolve, DisplayFormat, ServerZone, TimeContext, UserZone};

pub const SWAP_FILE: &str = "daily_slot_swap.json";
pub const ROTATION_FILE: &str = "arms_race_schedule.csv";
pub const DUEL_FILE: &str = "vs_duel_schedule.csv";
pub const SPECIAL_EVENTS_FILE: &str = "special_events.csv";
pub const TASK_TEMPLATES_FILE: &str = "daily_task_templates.csv";
pub const ACTIVE_TASKS_FILE: &str = "active_daily_tasks.csv";
pub const COMBINED_SCHEDULE_FILE: &str = "last_standing_schedule.csv";
pub const SECRETARY_FILE: &str = "secretary_event.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PLANNER_SERVER_TZ: {0}")]
    InvalidServerZone(#[source] crate::time_grid::ZoneError),
    #[error("PLANNER_USER_TZ: {0}")]
    InvalidUserZone(#[source] crate::time_grid::ZoneError),
    #[error("PLANNER_TIME_FORMAT: {0}")]
    InvalidTimeFormat(String),
    #[error("PLANNER_NOW must be an RFC 3339 timestamp, got `{0}`")]
    InvalidNow(String),
}

/// Runtime settings, read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub data_dir: PathBuf,
    pub server_zone: ServerZone,
    pub user_zone: UserZone,
    pub format: DisplayFormat,
    /// Fixed "now", for replaying a moment
    pub now: Option<DateTime<Utc>>,
}

impl PlannerConfig {
    /// Reads `PLANNER_*` variables, after loading `.env` if there is one
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_zone = match get("PLANNER_SERVER_TZ") {
            Some(value) => value.parse().map_err(ConfigError::InvalidServerZone)?,
            None => ServerZone::default(),
        };
        let user_zone = match get("PLANNER_USER_TZ") {
            Some(value) => value.parse().map_err(ConfigError::InvalidUserZone)?,
            None => UserZone::from(server_zone),
        };
        let format = match get("PLANNER_TIME_FORMAT") {
            Some(value) => value.parse().map_err(ConfigError::InvalidTimeFormat)?,
            None => DisplayFormat::default(),
        };
        let now = match get("PLANNER_NOW") {
            Some(value) => Some(
                DateTime::parse_from_rfc3339(value.trim())
                    .map_err(|_| ConfigError::InvalidNow(value.clone()))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(PlannerConfig {
            data_dir: get("PLANNER_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            server_zone,
            user_zone,
            format,
            now,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn time_context(&self) -> TimeContext {
        resolve(self.now(), self.server_zone, self.user_zone, self.format)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    pub fn swap_file(&self) -> PathBuf {
        self.data_file(SWAP_FILE)
    }

    pub fn rotation_file(&self) -> PathBuf {
        self.data_file(ROTATION_FILE)
    }

    pub fn duel_file(&self) -> PathBuf {
        self.data_file(DUEL_FILE)
    }

    /// Older single-table layout, read when the split tables are missing
    pub fn combined_schedule_file(&self) -> PathBuf {
        self.data_file(COMBINED_SCHEDULE_FILE)
    }

    pub fn secretary_file(&self) -> PathBuf {
        self.data_file(SECRETARY_FILE)
    }

    pub fn special_events_file(&self) -> PathBuf {
        self.data_file(SPECIAL_EVENTS_FILE)
    }

    pub fn task_templates_file(&self) -> PathBuf {
        self.data_file(TASK_TEMPLATES_FILE)
    }

    pub fn active_tasks_file(&self) -> PathBuf {
        self.data_file(ACTIVE_TASKS_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<PlannerConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        PlannerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_server_zone_everywhere() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.server_zone.label(), "UTC-2");
        assert_eq!(cfg.user_zone, UserZone::Fixed(cfg.server_zone));
        assert_eq!(cfg.format, DisplayFormat::TwentyFourHour);
        assert_eq!(cfg.swap_file(), PathBuf::from("data").join("daily_slot_swap.json"));
        assert_eq!(cfg.secretary_file(), PathBuf::from("data").join("secretary_event.json"));
        assert_eq!(cfg.combined_schedule_file(), PathBuf::from("data").join("last_standing_schedule.csv"));
        assert!(cfg.now.is_none());
    }

    #[test]
    fn reads_every_setting() {
        let cfg = config(&[
            ("PLANNER_DATA_DIR", "/tmp/planner"),
            ("PLANNER_SERVER_TZ", "UTC+3"),
            ("PLANNER_USER_TZ", "America/Halifax"),
            ("PLANNER_TIME_FORMAT", "12h"),
            ("PLANNER_NOW", "2026-02-05T11:30:00Z"),
        ])
        .unwrap();

        assert_eq!(cfg.server_zone.hours(), 3);
        assert_eq!(cfg.user_zone.label(), "America/Halifax");
        assert_eq!(cfg.format, DisplayFormat::TwelveHour);
        assert_eq!(cfg.now(), Utc.with_ymd_and_hms(2026, 2, 5, 11, 30, 0).unwrap());
        assert_eq!(cfg.rotation_file(), PathBuf::from("/tmp/planner/arms_race_schedule.csv"));
        // 11:30Z is 14:30 at UTC+3
        assert_eq!(cfg.time_context().current_slot.index(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config(&[("PLANNER_SERVER_TZ", "UTC+20")]), Err(ConfigError::InvalidServerZone(_))));
        assert!(matches!(config(&[("PLANNER_USER_TZ", "Mars/Olympus")]), Err(ConfigError::InvalidUserZone(_))));
        assert!(matches!(config(&[("PLANNER_TIME_FORMAT", "36h")]), Err(ConfigError::InvalidTimeFormat(_))));
        assert!(matches!(config(&[("PLANNER_NOW", "yesterday")]), Err(ConfigError::InvalidNow(_))));
    }
}
