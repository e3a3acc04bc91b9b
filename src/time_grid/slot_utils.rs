use chrono::{Duration, Weekday};

/// Weekdays in the order the weekly tables are kept
pub const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English day name, as stored in the schedule files
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses a day name ("Thursday", "thu")
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    value.trim().parse::<Weekday>().ok()
}

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hours: u32 = parts[0].parse().ok()?;
    let minutes: u32 = parts[1].parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes into a compact string: "2d 4h", "1h 30m", "45m" or "0m"
pub fn format_duration(total_minutes: i64) -> String {
    if total_minutes <= 0 {
        return "0m".to_string();
    }
    let days = total_minutes / 1440;
    let hours = (total_minutes % 1440) / 60;
    let mins = total_minutes % 60;
    if days > 0 {
        return if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        };
    }
    if hours > 0 {
        return if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        };
    }
    format!("{}m", mins)
}

/// Countdown label for something starting `until` from now: "NOW" or "in 3h 20m"
pub fn format_relative(until: Duration) -> String {
    let total_sec = until.num_seconds().max(0);
    if total_sec < 60 {
        return "NOW".to_string();
    }
    format!("in {}h {}m", total_sec / 3600, (total_sec % 3600) / 60)
}
