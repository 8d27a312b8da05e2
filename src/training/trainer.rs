//! Model fitting on a held-out split

use std::fmt;

use crate::data::dataset::TrainingSet;
use crate::model::{FittedModel, ModelKind, ModelSpec};
use crate::training::grid::{GridSearch, GridSearchResult, SearchSummary};
use crate::training::split::{train_test_split, SplitMode, TrainTestSplit};
use crate::{Config, GridironError, Result};

/// Fixed parameters fit once; a grid is searched with cross-validation
#[derive(Debug, Clone)]
pub enum Hyperparameters {
    Fixed(ModelSpec),
    Grid(GridSearch),
}

impl Hyperparameters {
    pub fn kind(&self) -> ModelKind {
        match self {
            Hyperparameters::Fixed(spec) => spec.kind(),
            Hyperparameters::Grid(search) => search.grid.kind(),
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hyperparameters::Fixed(spec) => write!(f, "{}", spec),
            Hyperparameters::Grid(search) => {
                write!(f, "{} grid ({}-fold CV)", search.grid.kind(), search.cv_folds)
            }
        }
    }
}

/// A fitted model with the split it was fitted on
#[derive(Debug)]
pub struct TrainedModel {
    pub model: FittedModel,
    pub spec: ModelSpec,
    pub split: TrainTestSplit,
    /// Present when the model came out of a grid search
    pub search: Option<SearchSummary>,
}

/// Splits scaled data and fits one model family
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    test_fraction: f64,
    fixed_mode: SplitMode,
    search_mode: SplitMode,
}

impl ModelTrainer {
    pub fn new(test_fraction: f64, fixed_mode: SplitMode, search_mode: SplitMode) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(GridironError::Configuration(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        Ok(ModelTrainer {
            test_fraction,
            fixed_mode,
            search_mode,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let split = &config.split;
        Self::new(
            split.test_fraction,
            split.fixed_mode.with_seed(split.seed),
            split.search_mode.with_seed(split.seed),
        )
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Split mode used for the given kind of hyperparameters
    pub fn mode_for(&self, hyperparameters: &Hyperparameters) -> SplitMode {
        match hyperparameters {
            Hyperparameters::Fixed(_) => self.fixed_mode,
            Hyperparameters::Grid(_) => self.search_mode,
        }
    }

    pub fn train(&self, data: &TrainingSet, hyperparameters: &Hyperparameters) -> Result<TrainedModel> {
        let split = train_test_split(data, self.test_fraction, self.mode_for(hyperparameters))?;
        self.train_on_split(split, hyperparameters)
    }

    /// Fit on an existing split's training rows
    pub fn train_on_split(
        &self,
        split: TrainTestSplit,
        hyperparameters: &Hyperparameters,
    ) -> Result<TrainedModel> {
        let x = split.train.features.view();
        let y = split.train.labels.view();

        log::info!("Training {} on {} rows", hyperparameters, split.train.len());

        match hyperparameters {
            Hyperparameters::Fixed(spec) => {
                let model = spec.fit(x, y)?;
                Ok(TrainedModel {
                    model,
                    spec: spec.clone(),
                    split,
                    search: None,
                })
            }
            Hyperparameters::Grid(search) => {
                let GridSearchResult {
                    best_model,
                    summary,
                } = search.run(x, y)?;
                Ok(TrainedModel {
                    model: best_model,
                    spec: summary.best_spec.clone(),
                    split,
                    search: Some(summary),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogisticParams, Predictor};
    use crate::testing::synthetic_classification;
    use crate::training::grid::{LogisticGrid, ParamGrid};

    fn data(rows: usize, seed: u64) -> TrainingSet {
        let (x, y) = synthetic_classification(rows, 4, seed);
        TrainingSet::new(x, y).unwrap()
    }

    fn logistic() -> Hyperparameters {
        Hyperparameters::Fixed(ModelSpec::Logistic(LogisticParams {
            c: 1.0,
            max_iterations: 200,
        }))
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(matches!(
            ModelTrainer::new(1.5, SplitMode::Sequential, SplitMode::Sequential),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_modes_from_config() {
        let trainer = ModelTrainer::from_config(&Config::default()).unwrap();
        assert_eq!(trainer.mode_for(&logistic()), SplitMode::Sequential);

        let search = GridSearch::for_model(ModelKind::Logistic, &Config::default()).unwrap();
        assert_eq!(
            trainer.mode_for(&Hyperparameters::Grid(search)),
            SplitMode::Shuffled { seed: 42 }
        );
    }

    #[test]
    fn test_fixed_training_is_reproducible() {
        let data = data(200, 42);
        let mode = SplitMode::Shuffled { seed: 42 };
        let trainer = ModelTrainer::new(0.25, mode, mode).unwrap();

        let first = trainer.train(&data, &logistic()).unwrap();
        let second = trainer.train(&data, &logistic()).unwrap();

        assert_eq!(first.split.train_indices, second.split.train_indices);
        assert_eq!(first.split.test_indices, second.split.test_indices);

        let test = &first.split.test;
        let a = first.model.score(test.features.view(), test.labels.view()).unwrap();
        let b = second.model.score(test.features.view(), test.labels.view()).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.8);
    }

    #[test]
    fn test_grid_training_keeps_search() {
        let data = data(160, 5);
        let trainer = ModelTrainer::new(
            0.25,
            SplitMode::Sequential,
            SplitMode::Shuffled { seed: 1 },
        )
        .unwrap();
        let search = GridSearch::new(
            ParamGrid::Logistic(LogisticGrid {
                c: vec![0.1, 10.0],
                max_iterations: 100,
            }),
            3,
        );

        let trained = trainer.train(&data, &Hyperparameters::Grid(search)).unwrap();
        let result = trained.search.as_ref().unwrap();
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(trained.spec, result.best_spec);
        assert_eq!(trained.split.test.len(), 40);
        assert_eq!(trained.split.train.len(), 120);
    }
}
