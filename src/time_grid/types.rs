use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::slot_utils::weekday_name;

/// Length of one slot in hours
pub const SLOT_HOURS: u32 = 4;

/// Server time boundaries for the 6 slots (each 4 hours)
pub const SLOT_START_HOURS: [u32; 6] = [0, 4, 8, 12, 16, 20];

/// Server-local hour at which once-per-day allowances renew
pub const DAILY_RESET_HOUR: u32 = 2;

/// Local timezones offered to the user, in display order
pub const SUPPORTED_USER_ZONES: [&str; 17] = [
    "America/Halifax",
    "US/Eastern",
    "US/Central",
    "US/Mountain",
    "US/Pacific",
    "US/Alaska",
    "US/Hawaii",
    "Canada/Eastern",
    "Canada/Pacific",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Asia/Seoul",
    "Australia/Sydney",
    "UTC",
];

/// Per-slot assignment for one day (slot -> payload)
pub type SlotMap<T> = BTreeMap<Slot, T>;

/// One of the six 4-hour server-time windows of a day, numbered 1-6
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("slot must be a number between 1 and 6, got `{0}`")]
pub struct InvalidSlot(pub String);

impl Slot {
    pub const COUNT: u8 = 6;

    pub fn new(index: u8) -> Option<Self> {
        (1..=Self::COUNT).contains(&index).then_some(Slot(index))
    }

    /// Slot containing the given server-local hour
    pub fn from_hour(hour: u32) -> Self {
        Slot(((hour % 24) / SLOT_HOURS) as u8 + 1)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Server-local hour at which this slot starts
    pub fn start_hour(self) -> u32 {
        SLOT_START_HOURS[usize::from(self.0 - 1)]
    }

    /// The slot after this one, wrapping from 6 back to 1
    pub fn next(self) -> Self {
        Slot(self.0 % Self::COUNT + 1)
    }

    pub fn all() -> impl Iterator<Item = Slot> {
        (1..=Self::COUNT).map(Slot)
    }
}

impl TryFrom<u8> for Slot {
    type Error = InvalidSlot;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Slot::new(value).ok_or_else(|| InvalidSlot(value.to_string()))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl FromStr for Slot {
    type Err = InvalidSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Slot::new)
            .ok_or_else(|| InvalidSlot(s.trim().to_string()))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneError {
    #[error("unsupported server timezone `{0}` (expected UTC-12 .. UTC+14)")]
    Server(String),
    #[error("unknown timezone `{0}`")]
    User(String),
}

/// The game's canonical clock: a whole-hour fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerZone {
    offset: FixedOffset,
}

impl ServerZone {
    pub const MIN_HOURS: i32 = -12;
    pub const MAX_HOURS: i32 = 14;

    pub fn from_hours(hours: i32) -> Option<Self> {
        if !(Self::MIN_HOURS..=Self::MAX_HOURS).contains(&hours) {
            return None;
        }
        FixedOffset::east_opt(hours * 3600).map(|offset| ServerZone { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn hours(&self) -> i32 {
        self.offset.local_minus_utc() / 3600
    }

    /// Label in the form used by the game ("UTC-2", "UTC+0")
    pub fn label(&self) -> String {
        format!("UTC{:+}", self.hours())
    }

    pub fn to_server(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Interprets a server-local wall-clock time as an instant
    pub fn at(&self, local: NaiveDateTime) -> DateTime<FixedOffset> {
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        self.offset.from_utc_datetime(&utc)
    }

    /// Server-local 00:00 of the given date
    pub fn midnight(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.at(date.and_time(NaiveTime::MIN))
    }

    /// Server-local 02:00 of the given date
    pub fn daily_reset(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.midnight(date) + Duration::hours(i64::from(DAILY_RESET_HOUR))
    }

    /// Every selectable server zone, the common ones first
    pub fn offered() -> Vec<ServerZone> {
        let preferred = [-2, 0];
        let mut zones: Vec<ServerZone> = preferred
            .iter()
            .filter_map(|&h| ServerZone::from_hours(h))
            .collect();
        zones.extend(
            (Self::MIN_HOURS..=Self::MAX_HOURS)
                .filter(|h| !preferred.contains(h))
                .filter_map(ServerZone::from_hours),
        );
        zones
    }
}

impl Default for ServerZone {
    fn default() -> Self {
        ServerZone::from_hours(-2).unwrap_or(ServerZone { offset: Utc.fix() })
    }
}

impl FromStr for ServerZone {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix("UTC")
            .ok_or_else(|| ZoneError::Server(trimmed.to_string()))?;
        let hours = if rest.is_empty() {
            0
        } else {
            rest.parse::<i32>()
                .map_err(|_| ZoneError::Server(trimmed.to_string()))?
        };
        ServerZone::from_hours(hours).ok_or_else(|| ZoneError::Server(trimmed.to_string()))
    }
}

impl fmt::Display for ServerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Timezone the user reads wall-clock times in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserZone {
    /// A fixed offset, used when the user has not picked a named zone
    Fixed(ServerZone),
    /// An IANA zone, daylight-saving aware
    Named(Tz),
}

impl UserZone {
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            UserZone::Fixed(zone) => zone.to_server(instant),
            UserZone::Named(tz) => {
                let local = instant.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            UserZone::Fixed(zone) => zone.label(),
            UserZone::Named(tz) => tz.name().to_string(),
        }
    }
}

impl From<ServerZone> for UserZone {
    fn from(zone: ServerZone) -> Self {
        UserZone::Fixed(zone)
    }
}

impl FromStr for UserZone {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("UTC") && trimmed.len() > 3 {
            if let Ok(zone) = trimmed.parse::<ServerZone>() {
                return Ok(UserZone::Fixed(zone));
            }
        }
        trimmed
            .parse::<Tz>()
            .map(UserZone::Named)
            .map_err(|_| ZoneError::User(trimmed.to_string()))
    }
}

impl fmt::Display for UserZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// How wall-clock times are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayFormat {
    /// `HH:mm`
    #[default]
    TwentyFourHour,
    /// `h:mm A`
    TwelveHour,
}

impl DisplayFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            DisplayFormat::TwentyFourHour => "%H:%M",
            DisplayFormat::TwelveHour => "%-I:%M %p",
        }
    }

    pub fn format(self, time: &DateTime<FixedOffset>) -> String {
        time.format(self.pattern()).to_string()
    }
}

impl FromStr for DisplayFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "24h" | "24" => Ok(DisplayFormat::TwentyFourHour),
            "12h" | "12" => Ok(DisplayFormat::TwelveHour),
            other => Err(format!("unknown time format `{}` (expected 24h or 12h)", other)),
        }
    }
}

/// Everything the planner needs to know about "now", resolved once per request
#[derive(Debug, Clone, PartialEq)]
pub struct TimeContext {
    pub server_zone: ServerZone,
    pub user_zone: UserZone,
    pub format: DisplayFormat,
    pub now_utc: DateTime<Utc>,
    pub now_server: DateTime<FixedOffset>,
    pub now_local: DateTime<FixedOffset>,
    pub current_slot: Slot,
    /// Start of the current slot window (server time)
    pub active_start: DateTime<FixedOffset>,
    /// Most recent server-local midnight at or before now
    pub game_day_start: DateTime<FixedOffset>,
    /// Server-local weekday, keys the weekly rotation
    pub day_label: Weekday,
}

impl TimeContext {
    pub fn server_date(&self) -> NaiveDate {
        self.now_server.date_naive()
    }

    pub fn day_name(&self) -> &'static str {
        weekday_name(self.day_label)
    }

    pub fn slot_end(&self) -> DateTime<FixedOffset> {
        self.active_start + Duration::hours(i64::from(SLOT_HOURS))
    }

    pub fn time_until_slot_end(&self) -> Duration {
        self.slot_end() - self.now_server
    }

    /// The next 02:00 server-local reset strictly after now
    pub fn next_daily_reset(&self) -> DateTime<FixedOffset> {
        let today = self.server_zone.daily_reset(self.server_date());
        if self.now_server >= today {
            today + Duration::days(1)
        } else {
            today
        }
    }

    /// The 02:00 server-local reset that opened the current reset period
    pub fn last_daily_reset(&self) -> DateTime<FixedOffset> {
        self.next_daily_reset() - Duration::days(1)
    }

    pub fn time_until_reset(&self) -> Duration {
        self.next_daily_reset() - self.now_server
    }

    /// Server date of the current reset period (the date rolls over at 02:00)
    pub fn reset_day(&self) -> NaiveDate {
        self.last_daily_reset().date_naive()
    }

    /// Start of `slot` on the current server day
    pub fn slot_start(&self, slot: Slot) -> DateTime<FixedOffset> {
        self.game_day_start + Duration::hours(i64::from(slot.start_hour()))
    }

    /// `count` consecutive slot windows, beginning with the active one
    pub fn window_starts(&self, count: usize) -> Vec<DateTime<FixedOffset>> {
        (0..count)
            .map(|i| self.active_start + Duration::hours(i as i64 * i64::from(SLOT_HOURS)))
            .collect()
    }

    pub fn to_local<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<FixedOffset> {
        self.user_zone.localize(instant.with_timezone(&Utc))
    }

    /// Wall-clock string of an instant in the user's zone
    pub fn format_local<Z: TimeZone>(&self, instant: &DateTime<Z>) -> String {
        self.format.format(&self.to_local(instant))
    }

    /// Wall-clock string of an instant in server time
    pub fn format_server<Z: TimeZone>(&self, instant: &DateTime<Z>) -> String {
        self.format.format(&self.server_zone.to_server(instant.with_timezone(&Utc)))
    }

    /// Today's `[start, end)` of a slot as user-local wall-clock strings
    pub fn slot_window_local(&self, slot: Slot) -> (String, String) {
        let start = self.slot_start(slot);
        let end = start + Duration::hours(i64::from(SLOT_HOURS));
        (self.format_local(&start), self.format_local(&end))
    }

    pub fn local_clock(&self) -> String {
        self.format.format(&self.now_local)
    }

    pub fn server_clock(&self) -> String {
        self.now_server.format("%H:%M").to_string()
    }
}
