//! Once-per-day exchange of two rotation slots.
//!
//! A swap is created from the slot the user is currently in and stays in
//! effect until the 02:00 server-time daily reset that follows its date.
//! The record is a singleton kept behind a [`SwapStore`]; storage problems
//! never block schedule resolution, they simply read as "no swap".

pub mod types;
pub mod store;
pub mod controller;

pub use types::{InvalidSwap, SlotSwap, SwapState};
pub use store::{JsonFileStore, MemoryStore, StoreError, SwapStore};
pub use controller::SlotSwapController;
