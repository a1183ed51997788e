//! Giftlist core: pure bulk-edit state and retry timing.
mod backoff;
mod progress;
mod selection;
mod tracker;

pub use backoff::BackoffSchedule;
pub use progress::{cosmetic_percent, PhaseMessages};
pub use selection::Selection;
pub use tracker::{ChangeTracker, EntityDiff, EntityId, FieldMap, FieldValue, TrackerError};
