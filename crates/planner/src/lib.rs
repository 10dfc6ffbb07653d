//! Editorial planner: candidate selection, schedule building, entry
//! lifecycle and usage commits on top of the catalog, rules and learned
//! weights.

pub mod builder;
pub mod commit;
pub mod lifecycle;
pub mod scorer;
pub mod selector;
pub mod types;

pub use builder::ScheduleBuilder;
pub use lifecycle::EntryLifecycle;
pub use scorer::AssetScorer;
pub use selector::{CandidateSelector, Selection, SelectionOutcome};
pub use types::{
    BuildOptions, PartialScheduleWarning, ScheduleEntry, ScheduleOutcome, SelectionRationale,
    Slot, UnfilledReason, UnfilledSlot,
};
