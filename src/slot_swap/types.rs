use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::time_grid::{ServerZone, Slot, SlotMap, TimeContext};

/// Today's exchange of two rotation slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SwapRecord")]
pub struct SlotSwap {
    /// Server-local date the swap was made on
    pub date: NaiveDate,
    pub from_slot: Slot,
    pub to_slot: Slot,
}

/// On-disk shape, checked before it becomes a [`SlotSwap`]
#[derive(Deserialize)]
struct SwapRecord {
    date: NaiveDate,
    from_slot: Slot,
    to_slot: Slot,
}

impl TryFrom<SwapRecord> for SlotSwap {
    type Error = InvalidSwap;

    fn try_from(record: SwapRecord) -> Result<Self, Self::Error> {
        if record.from_slot == record.to_slot {
            return Err(InvalidSwap::SameSlot(record.from_slot));
        }
        Ok(SlotSwap {
            date: record.date,
            from_slot: record.from_slot,
            to_slot: record.to_slot,
        })
    }
}

impl SlotSwap {
    /// The daily reset after `date`; the swap is gone from this instant on
    pub fn expires_at(&self, zone: ServerZone) -> DateTime<FixedOffset> {
        zone.daily_reset(self.date) + Duration::days(1)
    }

    pub fn is_valid_at(&self, ctx: &TimeContext) -> bool {
        ctx.now_server < self.expires_at(ctx.server_zone)
    }

    /// Slot that `slot` trades places with, if it takes part in the swap
    pub fn partner(&self, slot: Slot) -> Option<Slot> {
        if slot == self.from_slot {
            Some(self.to_slot)
        } else if slot == self.to_slot {
            Some(self.from_slot)
        } else {
            None
        }
    }

    /// Exchanges the two slots' entries in place. A slot without an entry
    /// leaves its partner empty.
    pub fn apply<T>(&self, schedule: &mut SlotMap<T>) {
        let from = schedule.remove(&self.from_slot);
        let to = schedule.remove(&self.to_slot);
        if let Some(entry) = from {
            schedule.insert(self.to_slot, entry);
        }
        if let Some(entry) = to {
            schedule.insert(self.from_slot, entry);
        }
    }
}

/// Observable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    NoSwap,
    SwapActive(SlotSwap),
}

impl SwapState {
    pub fn is_active(&self) -> bool {
        matches!(self, SwapState::SwapActive(_))
    }

    pub fn active(self) -> Option<SlotSwap> {
        match self {
            SwapState::SwapActive(swap) => Some(swap),
            SwapState::NoSwap => None,
        }
    }
}

/// A rejected swap request; nothing was changed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSwap {
    #[error("slot {0} cannot be swapped with itself")]
    SameSlot(Slot),
    #[error("swaps must start from the current slot {current}, not slot {requested}")]
    NotCurrentSlot { requested: Slot, current: Slot },
    #[error("today's swap is already used (slot {from_slot} <-> slot {to_slot}), it resets at 02:00 server time")]
    AlreadySwapped { from_slot: Slot, to_slot: Slot },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u8) -> Slot {
        Slot::new(n).unwrap()
    }

    fn swap(from: u8, to: u8) -> SlotSwap {
        SlotSwap {
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            from_slot: slot(from),
            to_slot: slot(to),
        }
    }

    #[test]
    fn apply_exchanges_only_the_named_slots() {
        let mut schedule: SlotMap<&str> = Slot::all()
            .zip(["Base", "Tech", "Drone", "Hero", "Unit", "All-Rounder"])
            .collect();
        swap(3, 5).apply(&mut schedule);

        let order: Vec<&str> = schedule.values().copied().collect();
        assert_eq!(order, ["Base", "Tech", "Unit", "Hero", "Drone", "All-Rounder"]);
    }

    #[test]
    fn apply_moves_a_lone_entry_across() {
        let mut schedule: SlotMap<&str> = SlotMap::new();
        schedule.insert(slot(2), "Tech");
        swap(2, 6).apply(&mut schedule);

        assert_eq!(schedule.get(&slot(6)), Some(&"Tech"));
        assert!(!schedule.contains_key(&slot(2)));
    }

    #[test]
    fn expiry_is_the_next_days_reset() {
        let expiry = swap(3, 5).expires_at(ServerZone::default());
        assert_eq!(expiry.naive_local().to_string(), "2026-02-06 02:00:00");
        assert_eq!(expiry.offset().local_minus_utc(), -2 * 3600);
    }

    #[test]
    fn partner_is_symmetric() {
        let s = swap(1, 4);
        assert_eq!(s.partner(slot(1)), Some(slot(4)));
        assert_eq!(s.partner(slot(4)), Some(slot(1)));
        assert_eq!(s.partner(slot(2)), None);
    }

    #[test]
    fn record_serializes_like_the_dashboard_file() {
        let json = serde_json::to_value(swap(3, 5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2026-02-05", "from_slot": 3, "to_slot": 5})
        );
    }
}
