use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use tracing::trace;

use super::types::{DisplayFormat, ServerZone, Slot, TimeContext, UserZone};

/// Resolves an instant against the server slot grid and the user's clock.
///
/// The slot, weekday and game day are derived from `server_zone` alone, so
/// daylight-saving changes in `user_zone` only move the local wall-clock
/// strings, never the slot.
pub fn resolve(
    now: DateTime<Utc>,
    server_zone: ServerZone,
    user_zone: UserZone,
    format: DisplayFormat,
) -> TimeContext {
    let now_server = server_zone.to_server(now);
    let now_local = user_zone.localize(now);

    // Server boundaries: 00:00-04:00, 04:00-08:00, ..., 20:00-00:00
    let current_slot = Slot::from_hour(now_server.hour());

    let game_day_start = server_zone.midnight(now_server.date_naive());
    let active_start = game_day_start + Duration::hours(i64::from(current_slot.start_hour()));

    trace!(
        server = %now_server,
        slot = current_slot.index(),
        "resolved time context"
    );

    TimeContext {
        server_zone,
        user_zone,
        format,
        now_utc: now,
        now_server,
        now_local,
        current_slot,
        active_start,
        game_day_start,
        day_label: now_server.weekday(),
    }
}
