use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::time_grid::format_duration;

/// Speed-up item sizes in minutes, largest first
pub const DENOMINATIONS: [(&str, i64); 5] = [
    ("8 Hours", 480),
    ("1 Hour", 60),
    ("15 Min", 15),
    ("5 Min", 5),
    ("1 Min", 1),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeedupError {
    #[error("unknown activity `{0}`, expected Training, Research, Construction or Other")]
    UnknownActivity(String),
    #[error("speed-up counts must be up to five whole numbers separated by commas, got `{0}`")]
    InvalidCounts(String),
    #[error("duration must look like `1d 2h 30m` or a number of minutes, got `{0}`")]
    InvalidDuration(String),
}

/// Parses "1d 2h 30m", "45m", "3h" or plain minutes into minutes
pub fn parse_duration(text: &str) -> Result<i64, SpeedupError> {
    let trimmed = text.trim();
    let invalid = || SpeedupError::InvalidDuration(trimmed.to_string());
    if let Ok(minutes) = trimmed.parse::<i64>() {
        return if minutes >= 0 { Ok(minutes) } else { Err(invalid()) };
    }

    let re = Regex::new(r"^(?:(\d+)\s*d)?\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?$").map_err(|_| invalid())?;
    let lowered = trimmed.to_lowercase();
    let caps = re.captures(&lowered).ok_or_else(invalid)?;
    if trimmed.is_empty() || caps.iter().skip(1).all(|group| group.is_none()) {
        return Err(invalid());
    }

    let part = |i: usize, size: i64| -> Result<i64, SpeedupError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<i64>().map(|n| n * size).map_err(|_| invalid()),
            None => Ok(0),
        }
    };
    Ok(part(1, 1440)? + part(2, 60)? + part(3, 1)?)
}

/// What the speed-ups are spent on; typed items only apply to their own kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Training,
    Research,
    Construction,
    Other,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activity::Training => "Training",
            Activity::Research => "Research",
            Activity::Construction => "Construction",
            Activity::Other => "Other",
        };
        f.write_str(name)
    }
}

impl FromStr for Activity {
    type Err = SpeedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "training" => Ok(Activity::Training),
            "research" => Ok(Activity::Research),
            "construction" => Ok(Activity::Construction),
            "other" => Ok(Activity::Other),
            _ => Err(SpeedupError::UnknownActivity(s.trim().to_string())),
        }
    }
}

/// Item counts per denomination, in `DENOMINATIONS` order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeedupPool(pub [u32; 5]);

impl SpeedupPool {
    pub fn minutes(&self) -> i64 {
        self.0
            .iter()
            .zip(DENOMINATIONS)
            .map(|(&count, (_, size))| i64::from(count) * size)
            .sum()
    }

    /// Fewest items covering `minutes`, largest first
    pub fn covering(minutes: i64) -> Self {
        let mut rest = minutes.max(0);
        let mut counts = [0u32; 5];
        for (count, (_, size)) in counts.iter_mut().zip(DENOMINATIONS) {
            *count = u32::try_from(rest / size).unwrap_or(u32::MAX);
            rest -= i64::from(*count) * size;
        }
        SpeedupPool(counts)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&count| count == 0)
    }
}

impl FromStr for SpeedupPool {
    type Err = SpeedupError;

    /// "0,2,4" fills the largest denominations first; missing ones are 0
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SpeedupError::InvalidCounts(s.trim().to_string());
        let mut counts = [0u32; 5];
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() > counts.len() {
            return Err(invalid());
        }
        for (count, part) in counts.iter_mut().zip(parts) {
            if !part.is_empty() {
                *count = part.parse().map_err(|_| invalid())?;
            }
        }
        Ok(SpeedupPool(counts))
    }
}

impl fmt::Display for SpeedupPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .0
            .iter()
            .zip(DENOMINATIONS)
            .filter(|(count, _)| **count > 0)
            .map(|(count, (label, _))| format!("{} x {}", count, label))
            .collect();
        if items.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&items.join(", "))
        }
    }
}

/// Result of spending both pools on one activity
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedupPlan {
    pub activity: Activity,
    pub base_minutes: i64,
    pub typed_applied: i64,
    pub general_applied: i64,
    pub remaining: i64,
    pub leftover: i64,
    /// Share of the base the pools cover; 0 when there is no base
    pub coverage_pct: f64,
    pub still_needed: SpeedupPool,
}

impl SpeedupPlan {
    /// Typed items are used first and general items fill what is left
    pub fn compute(activity: Activity, base_minutes: i64, general: &SpeedupPool, typed: &SpeedupPool) -> Self {
        let base = base_minutes.max(0);
        let general_total = general.minutes();
        let typed_total = typed.minutes();
        let total = general_total + typed_total;
        let remaining = (base - total).max(0);

        SpeedupPlan {
            activity,
            base_minutes: base,
            typed_applied: typed_total.min(base),
            general_applied: general_total.min((base - typed_total).max(0)),
            remaining,
            leftover: (total - base).max(0),
            coverage_pct: if base > 0 {
                total as f64 / base as f64 * 100.0
            } else {
                0.0
            },
            still_needed: SpeedupPool::covering(remaining),
        }
    }

    pub fn fully_covered(&self) -> bool {
        self.base_minutes > 0 && self.remaining == 0
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Base duration:   {}", format_duration(self.base_minutes)),
            format!("{} used: {}", self.activity, format_duration(self.typed_applied)),
            format!("General used:    {}", format_duration(self.general_applied)),
            format!("Time remaining:  {}", format_duration(self.remaining)),
        ];
        if self.base_minutes == 0 {
            lines.push("Enter a base duration to start calculating".to_string());
        } else if self.fully_covered() {
            lines.push(format!(
                "Fully covered ({:.0}%), {} left over",
                self.coverage_pct,
                format_duration(self.leftover)
            ));
        } else {
            lines.push(format!(
                "Covered {:.0}%, still needs {}: {}",
                self.coverage_pct,
                format_duration(self.remaining),
                self.still_needed
            ));
        }
        lines
    }
}
