use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::slot_swap::store::{read_record, remove_record, write_atomically, StoreError};
use crate::time_grid::TimeContext;

/// How long one secretary turn lasts
pub const BUFF_MINUTES: i64 = 5;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// The five secretary positions and the bonuses they grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Secretary {
    #[serde(rename = "Secretary of Strategy")]
    Strategy,
    #[serde(rename = "Secretary of Defense")]
    Defense,
    #[serde(rename = "Secretary of Development")]
    Development,
    #[serde(rename = "Secretary of Science")]
    Science,
    #[serde(rename = "Secretary of Interior")]
    Interior,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown secretary `{0}`")]
pub struct UnknownSecretary(pub String);

impl Secretary {
    pub const ALL: [Secretary; 5] = [
        Secretary::Strategy,
        Secretary::Defense,
        Secretary::Development,
        Secretary::Science,
        Secretary::Interior,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            Secretary::Strategy => "Strategy",
            Secretary::Defense => "Defense",
            Secretary::Development => "Development",
            Secretary::Science => "Science",
            Secretary::Interior => "Interior",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Secretary::Strategy => "🏥",
            Secretary::Defense => "⚔️",
            Secretary::Development => "🏗️",
            Secretary::Science => "🔬",
            Secretary::Interior => "🏘️",
        }
    }

    /// (bonus, amount) pairs granted while the turn lasts
    pub fn bonuses(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Secretary::Strategy => &[("Hospital Capacity", "+20%"), ("Unit Healing", "+20%")],
            Secretary::Defense => &[("Unit Training Cap", "+20%"), ("Training Speed", "+20%")],
            Secretary::Development => &[("Construction Speed", "+50%"), ("Research Speed", "+25%")],
            Secretary::Science => &[("Research Speed", "+50%"), ("Construction Speed", "+25%")],
            Secretary::Interior => &[("Food", "+100%"), ("Iron", "+100%"), ("Coin", "+100%")],
        }
    }
}

impl fmt::Display for Secretary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secretary of {}", self.short_name())
    }
}

impl FromStr for Secretary {
    type Err = UnknownSecretary;

    /// Accepts "science" as well as "Secretary of Science"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let name = lower.strip_prefix("secretary of ").unwrap_or(&lower).trim();
        Secretary::ALL
            .into_iter()
            .find(|sec| sec.short_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownSecretary(trimmed.to_string()))
    }
}

/// Where a turn stands relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffStatus {
    Upcoming,
    Active,
    Expired,
}

/// One booked secretary turn, stored as the singleton record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretaryBuff {
    #[serde(rename = "type")]
    pub secretary: Secretary,
    pub start_time_utc: DateTime<Utc>,
    pub end_time_utc: DateTime<Utc>,
}

impl SecretaryBuff {
    pub fn starting_at(secretary: Secretary, start: DateTime<Utc>) -> Self {
        SecretaryBuff {
            secretary,
            start_time_utc: start,
            end_time_utc: start + Duration::minutes(BUFF_MINUTES),
        }
    }

    /// Turn starting at the next `hour:minute` on the server clock. A time
    /// earlier than the current server minute means tomorrow.
    pub fn at_server_time(secretary: Secretary, ctx: &TimeContext, hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        let target = i64::from(hour * 60 + minute);
        let current = i64::from(ctx.now_server.hour() * 60 + ctx.now_server.minute());
        let delta = (target - current).rem_euclid(MINUTES_PER_DAY);
        Some(Self::starting_at(secretary, ctx.now_utc + Duration::minutes(delta)))
    }

    /// Turn starting after everyone ahead in the queue has had theirs
    pub fn after_queue(secretary: Secretary, ctx: &TimeContext, people_ahead: u32) -> Self {
        let wait = i64::from(people_ahead) * BUFF_MINUTES;
        Self::starting_at(secretary, ctx.now_utc + Duration::minutes(wait))
    }

    pub fn status(&self, now: DateTime<Utc>) -> BuffStatus {
        if now >= self.end_time_utc {
            BuffStatus::Expired
        } else if now < self.start_time_utc {
            BuffStatus::Upcoming
        } else {
            BuffStatus::Active
        }
    }

    /// Overview line, e.g. "🔬 Science starts 10:05"
    pub fn countdown(&self, ctx: &TimeContext) -> Option<String> {
        let (verb, at) = match self.status(ctx.now_utc) {
            BuffStatus::Expired => return None,
            BuffStatus::Upcoming => ("starts", self.start_time_utc),
            BuffStatus::Active => ("ends", self.end_time_utc),
        };
        Some(format!(
            "{} {} {} {}",
            self.secretary.icon(),
            self.secretary.short_name(),
            verb,
            ctx.format_local(&at)
        ))
    }
}

/// JSON file holding at most one booked turn
#[derive(Debug, Clone)]
pub struct SecretaryStore {
    path: PathBuf,
}

impl SecretaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SecretaryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, blank or `null` files read as no turn
    pub fn load(&self) -> Result<Option<SecretaryBuff>, StoreError> {
        let Some(contents) = read_record(&self.path)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&mut self, buff: &SecretaryBuff) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(buff)?;
        write_atomically(&self.path, &json)?;
        info!(secretary = %buff.secretary, start = %buff.start_time_utc, "secretary turn saved");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        Ok(remove_record(&self.path)?)
    }

    /// The booked turn unless it has ended. An ended turn is removed from
    /// disk; storage errors read as no turn.
    pub fn current(&mut self, now: DateTime<Utc>) -> Option<SecretaryBuff> {
        let buff = match self.load() {
            Ok(buff) => buff?,
            Err(err) => {
                warn!(error = %err, "could not read secretary record, continuing without one");
                return None;
            }
        };
        if buff.status(now) != BuffStatus::Expired {
            return Some(buff);
        }

        debug!(secretary = %buff.secretary, end = %buff.end_time_utc, "secretary turn expired");
        if let Err(err) = self.clear() {
            warn!(error = %err, "could not clear expired secretary record");
        }
        None
    }
}
