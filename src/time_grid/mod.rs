pub mod types;
pub mod slot_utils;
pub mod resolver;

pub use types::{
    DisplayFormat, InvalidSlot, ServerZone, Slot, SlotMap, TimeContext, UserZone, ZoneError,
    DAILY_RESET_HOUR, SLOT_HOURS, SLOT_START_HOURS, SUPPORTED_USER_ZONES,
};
pub use slot_utils::{format_duration, format_relative, parse_time_to_minutes, parse_weekday, weekday_name, WEEK_DAYS};
pub use resolver::resolve;
