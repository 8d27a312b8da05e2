//! Feature extraction and scaling
//!
//! Converts cleaned games into per-team aggregates and rescales feature
//! matrices before fitting.

pub mod scaling;
pub mod team_stats;

pub use scaling::{FittedScaler, ScalerKind, ScalingMethod};
pub use team_stats::{SeasonTable, TeamProfile, TeamStatistics};
