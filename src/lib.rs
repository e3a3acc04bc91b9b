//! Planning core for a strategy game dashboard: the server-time slot grid,
//! the once-per-day slot swap, and the 24-hour plan built on top of them.

pub mod time_grid;
pub mod slot_swap;
pub mod schedule;
pub mod parser;
pub mod config;
pub mod display;
