//! Model training and evaluation
//!
//! Splitting, grid search, metrics, the metrics log and the end-to-end
//! pipelines built from them.

pub mod grid;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod split;
pub mod trainer;

pub use grid::{GridSearch, ParamGrid, SearchSummary};
pub use metrics::{evaluate, ConfusionMatrix, Evaluation};
pub use report::{render_heatmap, ReportLog};
pub use split::{SplitMode, SplitStrategy};
pub use trainer::{Hyperparameters, ModelTrainer, TrainedModel};
