//! Data ingestion and storage
//!
//! Per-season CSV store, franchise name resolution, cleaning and the
//! season-transition dataset builder.

pub mod cleaning;
pub mod dataset;
pub mod franchise;
pub mod store;

pub use cleaning::{clean_season, CleanedGame, CleanedSeason};
pub use dataset::{build_from_batches, build_training_set, TrainingSet};
pub use franchise::FranchiseId;
pub use store::{SeasonBatch, SeasonStore};
