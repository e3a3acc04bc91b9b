use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::store::SwapStore;
use super::types::{InvalidSwap, SlotSwap, SwapState};
use crate::schedule::DaySchedule;
use crate::time_grid::{Slot, SlotMap, TimeContext};

/// Owns the swap record and grants at most one swap per reset period
#[derive(Debug)]
pub struct SlotSwapController<S> {
    store: S,
}

impl<S: SwapStore> SlotSwapController<S> {
    pub fn new(store: S) -> Self {
        SlotSwapController { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Reads the record, dropping it if it has expired.
    ///
    /// Every public operation starts here. A record that cannot be read is
    /// reported as [`SwapState::NoSwap`].
    pub fn normalize(&mut self, ctx: &TimeContext) -> SwapState {
        let record = match self.store.load() {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "could not read slot swap record, continuing without a swap");
                return SwapState::NoSwap;
            }
        };

        let Some(swap) = record else {
            return SwapState::NoSwap;
        };

        if swap.is_valid_at(ctx) {
            return SwapState::SwapActive(swap);
        }

        debug!(date = %swap.date, from = %swap.from_slot, to = %swap.to_slot, "slot swap expired at daily reset");
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "could not clear expired slot swap record");
        }
        SwapState::NoSwap
    }

    pub fn is_swap_valid(&mut self, ctx: &TimeContext) -> bool {
        self.normalize(ctx).is_active()
    }

    pub fn active_swap(&mut self, ctx: &TimeContext) -> Option<SlotSwap> {
        self.normalize(ctx).active()
    }

    /// True while today's swap is still unused
    pub fn can_swap_today(&mut self, ctx: &TimeContext) -> bool {
        !self.is_swap_valid(ctx)
    }

    /// Swaps the current slot with `to_slot` until the next daily reset.
    ///
    /// The swap must start from the slot the user is in right now. If the
    /// record cannot be written the swap is logged and dropped.
    ///
    /// The record is dated with the server calendar date, so a swap made
    /// between 00:00 and the 02:00 reset lasts until the reset of the
    /// following day and uses up that period's swap as well.
    pub fn request_swap(
        &mut self,
        ctx: &TimeContext,
        from_slot: Slot,
        to_slot: Slot,
    ) -> Result<SlotSwap, InvalidSwap> {
        let state = self.normalize(ctx);

        if from_slot == to_slot {
            return Err(InvalidSwap::SameSlot(from_slot));
        }
        if from_slot != ctx.current_slot {
            return Err(InvalidSwap::NotCurrentSlot {
                requested: from_slot,
                current: ctx.current_slot,
            });
        }
        if let SwapState::SwapActive(existing) = state {
            return Err(InvalidSwap::AlreadySwapped {
                from_slot: existing.from_slot,
                to_slot: existing.to_slot,
            });
        }

        let swap = SlotSwap {
            date: ctx.server_date(),
            from_slot,
            to_slot,
        };

        match self.store.save(&swap) {
            Ok(()) => info!(date = %swap.date, from = %from_slot, to = %to_slot, "slot swap saved"),
            Err(err) => warn!(error = %err, "could not save slot swap, it will not take effect"),
        }

        Ok(swap)
    }

    /// Drops today's swap. Safe to call when there is none.
    pub fn cancel_swap(&mut self) {
        match self.store.clear() {
            Ok(()) => debug!("slot swap cleared"),
            Err(err) => warn!(error = %err, "could not clear slot swap record"),
        }
    }

    /// Copy of `base` with the swapped slots exchanged, or an unmodified copy
    /// when no swap is active. Only pass the rotation category's map here.
    pub fn effective_schedule<T: Clone>(&mut self, base: &SlotMap<T>, ctx: &TimeContext) -> SlotMap<T> {
        let mut schedule = base.clone();
        if let Some(swap) = self.active_swap(ctx) {
            swap.apply(&mut schedule);
        }
        schedule
    }

    /// Effective schedule for the day falling on `date`.
    ///
    /// The swap only rewrites the rotation of its own date; the duel
    /// entries are copied untouched.
    pub fn effective_day(&mut self, day: &DaySchedule, date: NaiveDate, ctx: &TimeContext) -> DaySchedule {
        let mut effective = day.clone();
        if let Some(swap) = self.active_swap(ctx) {
            if swap.date == date {
                effective.apply_swap(&swap);
            }
        }
        effective
    }
}
