//! Outcome feedback: learned score weights and the adjuster that updates
//! them from measured engagement.

pub mod adjuster;
pub mod baseline;
pub mod weights;

pub use adjuster::{IngestReport, OutcomeFeedbackAdjuster, SkippedRecord};
pub use weights::{InMemoryWeightsStore, ScoreWeights, WeightKey, WeightsStore};
