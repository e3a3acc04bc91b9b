use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::time_grid::TimeContext;

pub const ACTIVE_STATUS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rarity {
    N,
    R,
    SR,
    SSR,
    UR,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [Rarity::N, Rarity::R, Rarity::SR, Rarity::SSR, Rarity::UR];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::N => "N",
            Rarity::R => "R",
            Rarity::SR => "SR",
            Rarity::SSR => "SSR",
            Rarity::UR => "UR",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaskError::UnknownRarity(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("unknown rarity {0:?}")]
    UnknownRarity(String),
    #[error("{name} has no {rarity} level")]
    RarityDisabled { name: String, rarity: Rarity },
    #[error("{name} already used {max_daily}/{max_daily} times today")]
    DailyLimitReached { name: String, max_daily: u32 },
    #[error("no task template named {0:?}")]
    UnknownTemplate(String),
    #[error("no active task with id {0:?}")]
    UnknownTask(String),
}

/// A running timed task, one row of the active task table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub task_id: String,
    pub task_name: String,
    pub start_time_utc: DateTime<Utc>,
    pub duration_minutes: u32,
    pub end_time_utc: DateTime<Utc>,
    pub status: String,
}

impl ActiveTask {
    /// Name without the trailing ` (RARITY)`
    pub fn base_name(&self) -> &str {
        match self.task_name.split_once(" (") {
            Some((base, _)) => base,
            None => &self.task_name,
        }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time_utc < end && self.end_time_utc > start
    }
}

/// Reusable definition a task is activated from. A zero duration disables
/// that rarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub name: String,
    pub duration_n: u32,
    pub duration_r: u32,
    pub duration_sr: u32,
    pub duration_ssr: u32,
    pub duration_ur: u32,
    pub max_daily: u32,
    pub category: String,
}

impl TaskTemplate {
    pub fn duration(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::N => self.duration_n,
            Rarity::R => self.duration_r,
            Rarity::SR => self.duration_sr,
            Rarity::SSR => self.duration_ssr,
            Rarity::UR => self.duration_ur,
        }
    }

    pub fn enabled_rarities(&self) -> Vec<Rarity> {
        Rarity::ALL.into_iter().filter(|r| self.duration(*r) > 0).collect()
    }

    pub fn remaining_today(&self, activations_today: u32) -> u32 {
        self.max_daily.saturating_sub(activations_today)
    }

    /// Starts the task now at the given rarity
    pub fn activate(
        &self,
        rarity: Rarity,
        ctx: &TimeContext,
        activations_today: u32,
    ) -> Result<ActiveTask, TaskError> {
        let duration = self.duration(rarity);
        if duration == 0 {
            return Err(TaskError::RarityDisabled {
                name: self.name.clone(),
                rarity,
            });
        }
        if activations_today >= self.max_daily {
            return Err(TaskError::DailyLimitReached {
                name: self.name.clone(),
                max_daily: self.max_daily,
            });
        }

        let start = ctx.now_utc;
        Ok(ActiveTask {
            task_id: format!("{}_{}", self.name, start.timestamp()),
            task_name: format!("{} ({})", self.name, rarity),
            start_time_utc: start,
            duration_minutes: duration,
            end_time_utc: start + Duration::minutes(i64::from(duration)),
            status: ACTIVE_STATUS.to_string(),
        })
    }
}

/// Template whose name matches `name`, ignoring case
pub fn find_template<'a>(templates: &'a [TaskTemplate], name: &str) -> Result<&'a TaskTemplate, TaskError> {
    templates
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| TaskError::UnknownTemplate(name.trim().to_string()))
}

/// Removes a finished task ahead of its end time
pub fn complete_task(tasks: &mut Vec<ActiveTask>, task_id: &str) -> Result<ActiveTask, TaskError> {
    let pos = tasks
        .iter()
        .position(|t| t.task_id == task_id)
        .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;
    Ok(tasks.remove(pos))
}

/// Drops tasks that ended at or before `now`
pub fn cleanup_expired(tasks: Vec<ActiveTask>, now: DateTime<Utc>) -> Vec<ActiveTask> {
    tasks.into_iter().filter(|t| t.end_time_utc > now).collect()
}

pub fn active_in_window(tasks: &[ActiveTask], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
    tasks
        .iter()
        .filter(|t| t.overlaps(start, end))
        .map(|t| t.task_name.clone())
        .collect()
}

pub fn has_ending_in_window(tasks: &[ActiveTask], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    tasks
        .iter()
        .any(|t| start <= t.end_time_utc && t.end_time_utc < end)
}

/// Activations of `base_name` since the most recent daily reset
pub fn daily_activation_count(tasks: &[ActiveTask], base_name: &str, ctx: &TimeContext) -> u32 {
    let reset = ctx.last_daily_reset().with_timezone(&Utc);
    let count = tasks
        .iter()
        .filter(|t| t.base_name() == base_name && t.start_time_utc >= reset)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Merges rarity suffixes of tasks sharing a base name, keeping first-seen order.
/// `["Squad (UR)", "Squad (SSR)", "Other"]` becomes `["Squad (UR, SSR)", "Other"]`.
pub fn group_by_base_name(names: &[String]) -> Vec<String> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for name in names {
        let (base, suffix) = match name.rfind('(') {
            Some(open) if name.ends_with(')') => (
                name[..open].trim().to_string(),
                Some(name[open + 1..name.len() - 1].trim().to_string()),
            ),
            _ => (name.clone(), None),
        };

        let pos = match groups.iter().position(|(b, _)| *b == base) {
            Some(pos) => pos,
            None => {
                groups.push((base, Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(suffix) = suffix {
            groups[pos].1.push(suffix);
        }
    }

    groups
        .into_iter()
        .map(|(base, suffixes)| {
            if suffixes.is_empty() {
                base
            } else {
                format!("{} ({})", base, suffixes.join(", "))
            }
        })
        .collect()
}
