pub mod types;
pub mod overlap;
pub mod special;
pub mod tasks;
pub mod plan;
pub mod secretary;
pub mod speedups;

pub use types::{DaySchedule, DuelEntry, RotationEntry, WeeklySchedule};
pub use overlap::{overlapping_duel_events, Multiplier};
pub use special::{Frequency, SpecialEvent};
pub use tasks::{ActiveTask, Rarity, TaskError, TaskTemplate};
pub use plan::{build_plan, scan_upcoming, PlanInputs, PlanRow, Upcoming, UpcomingWindow};
pub use secretary::{BuffStatus, Secretary, SecretaryBuff, SecretaryStore};
pub use speedups::{Activity, SpeedupPlan, SpeedupPool};
