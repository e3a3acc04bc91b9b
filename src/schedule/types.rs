use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::slot_swap::SlotSwap;
use crate::time_grid::{Slot, SlotMap, WEEK_DAYS};

/// One task row of the rotation ("Arms Race") for a day and slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEntry {
    pub day: Weekday,
    pub slot: Slot,
    pub event: String,
    pub task: String,
    pub points: String,
}

/// One task row of the day's duel ("VS")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelEntry {
    pub day: Weekday,
    pub event: String,
    pub task: String,
    pub points: String,
}

/// Schedule for a single day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub day: Weekday,
    pub rotation: SlotMap<Vec<RotationEntry>>, // slot -> task rows
    pub duel: Vec<DuelEntry>,
}

impl DaySchedule {
    /// Event name shown for a slot (first task row wins)
    pub fn rotation_event(&self, slot: Slot) -> Option<&str> {
        self.rotation
            .get(&slot)
            .and_then(|rows| rows.first())
            .map(|row| row.event.as_str())
    }

    /// Exchanges the rotation of the two swapped slots and relabels the rows.
    /// The duel is never touched.
    pub fn apply_swap(&mut self, swap: &SlotSwap) {
        swap.apply(&mut self.rotation);
        for (slot, rows) in self.rotation.iter_mut() {
            for row in rows.iter_mut() {
                row.slot = *slot;
            }
        }
    }
}

/// Both weekly tables, as loaded from disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub rotation: Vec<RotationEntry>,
    pub duel: Vec<DuelEntry>,
}

impl WeeklySchedule {
    pub fn rotation_for(&self, day: Weekday) -> SlotMap<Vec<RotationEntry>> {
        let mut by_slot: SlotMap<Vec<RotationEntry>> = SlotMap::new();
        for entry in self.rotation.iter().filter(|e| e.day == day) {
            by_slot.entry(entry.slot).or_default().push(entry.clone());
        }
        by_slot
    }

    pub fn duel_for(&self, day: Weekday) -> Vec<DuelEntry> {
        self.duel.iter().filter(|e| e.day == day).cloned().collect()
    }

    pub fn day(&self, day: Weekday) -> DaySchedule {
        DaySchedule {
            day,
            rotation: self.rotation_for(day),
            duel: self.duel_for(day),
        }
    }

    /// Replaces one weekday's rotation with one event per slot.
    /// Each event becomes its own task with standard points.
    pub fn set_rotation_day(&mut self, day: Weekday, events: &SlotMap<String>) {
        self.rotation.retain(|e| e.day != day);
        for (slot, event) in events {
            self.rotation.push(RotationEntry {
                day,
                slot: *slot,
                event: event.clone(),
                task: event.clone(),
                points: "Standard".to_string(),
            });
        }
        self.sort_rotation();
    }

    /// Orders the rotation by weekday, then slot
    pub fn sort_rotation(&mut self) {
        let day_index = |day: Weekday| WEEK_DAYS.iter().position(|d| *d == day).unwrap_or(WEEK_DAYS.len());
        self.rotation
            .sort_by(|a, b| (day_index(a.day), a.slot).cmp(&(day_index(b.day), b.slot)));
    }
}
