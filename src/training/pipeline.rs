//! End-to-end runs: build → scale → fit → evaluate
//!
//! The fitted scaler travels with the fitted model so that raw feature
//! rows scored later go through the same transform as the training rows.

use ndarray::{Array1, ArrayView2};

use crate::data::dataset::{build_training_set, TrainingSet};
use crate::data::store::SeasonStore;
use crate::features::scaling::{fit_transform, FittedScaler, ScalerKind, ScalingMethod};
use crate::model::{FittedStacking, ModelKind, ModelSpec, Predictor, StackingClassifier};
use crate::training::grid::{GridSearch, SearchSummary};
use crate::training::metrics::{evaluate, Evaluation};
use crate::training::report::ReportLog;
use crate::training::split::{train_test_split, SplitMode, TrainTestSplit};
use crate::training::trainer::{Hyperparameters, ModelTrainer, TrainedModel};
use crate::{Config, GridironError, Result};

/// Read the configured season range from the store and build features
pub fn load_training_set(config: &Config) -> Result<TrainingSet> {
    let store = SeasonStore::open(&config.data.store_dir)?;
    build_training_set(&store, config.seasons.start_year, config.seasons.end_year)
}

/// Fit `method` on the whole set and return it rescaled
pub fn scale(
    data: &TrainingSet,
    method: impl Into<ScalingMethod>,
) -> Result<(FittedScaler, TrainingSet)> {
    let (scaler, features) = fit_transform(method, data.features.view())?;
    let scaled = TrainingSet::new(features, data.labels.clone())?;
    Ok((scaler, scaled))
}

/// A scaler and the model fitted on its output
#[derive(Debug)]
pub struct TrainedPipeline {
    pub scaler: FittedScaler,
    pub trained: TrainedModel,
    /// Held-out evaluation
    pub evaluation: Evaluation,
}

impl Predictor for TrainedPipeline {
    /// Predict from unscaled feature rows
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        let scaled = self.scaler.transform(x)?;
        self.trained.model.predict(scaled.view())
    }
}

/// Scale, split and fit with the given hyperparameters, then evaluate on
/// the held-out rows
pub fn run(
    config: &Config,
    data: &TrainingSet,
    scaler: ScalerKind,
    hyperparameters: &Hyperparameters,
) -> Result<TrainedPipeline> {
    let (scaler, scaled) = scale(data, scaler)?;
    let trainer = ModelTrainer::from_config(config)?;
    let trained = trainer.train(&scaled, hyperparameters)?;
    let evaluation = held_out(&trained)?;

    Ok(TrainedPipeline {
        scaler,
        trained,
        evaluation,
    })
}

/// Fit `kind` with its configured fixed hyperparameters
pub fn train(
    config: &Config,
    data: &TrainingSet,
    kind: ModelKind,
    scaler: ScalerKind,
) -> Result<TrainedPipeline> {
    let spec = ModelSpec::from_config(kind, config)?;
    run(config, data, scaler, &Hyperparameters::Fixed(spec))
}

/// Grid-search `kind` over its configured grid
pub fn tune(
    config: &Config,
    data: &TrainingSet,
    kind: ModelKind,
    scaler: ScalerKind,
) -> Result<TrainedPipeline> {
    let search = GridSearch::for_model(kind, config)?;
    run(config, data, scaler, &Hyperparameters::Grid(search))
}

/// One scaler × round cell of a sweep
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub scaler: ScalingMethod,
    pub round: usize,
    /// Held-out accuracy of the configured fixed hyperparameters
    pub baseline_accuracy: f64,
    /// Held-out accuracy of the grid winner
    pub tuned_accuracy: f64,
    pub search: SearchSummary,
}

/// Compare the sweep scalers: per round, a fresh shuffled split, a
/// baseline fit with the configured fixed hyperparameters and a grid
/// search, each appended to `report`
pub fn sweep(
    config: &Config,
    data: &TrainingSet,
    kind: ModelKind,
    rounds: usize,
    report: &ReportLog,
) -> Result<Vec<SweepOutcome>> {
    let trainer = ModelTrainer::from_config(config)?;
    let baseline = Hyperparameters::Fixed(ModelSpec::from_config(kind, config)?);
    let search = Hyperparameters::Grid(GridSearch::for_model(kind, config)?);

    let mut outcomes = Vec::with_capacity(ScalingMethod::SWEEP.len() * rounds);
    for method in ScalingMethod::SWEEP {
        let (_, scaled) = scale(data, method)?;

        for round in 0..rounds {
            let seed = config.split.seed.wrapping_add(round as u64);
            let split = train_test_split(
                &scaled,
                trainer.test_fraction(),
                SplitMode::Shuffled { seed },
            )?;
            log::info!(
                "Sweep {} | {} | round {}/{}",
                kind,
                method,
                round + 1,
                rounds
            );

            let fixed = trainer.train_on_split(split.clone(), &baseline)?;
            let fixed_eval = held_out(&fixed)?;
            report.append(
                &format!("{} baseline | {} | round {}", kind, method, round + 1),
                &fixed_eval,
                None,
            )?;

            let tuned = trainer.train_on_split(split, &search)?;
            let tuned_eval = held_out(&tuned)?;
            let summary = tuned.search.clone().ok_or_else(|| GridironError::Model {
                model: kind.to_string(),
                message: "grid search produced no summary".to_string(),
            })?;
            report.append(
                &format!("{} tuned | {} | round {}", kind, method, round + 1),
                &tuned_eval,
                Some(&summary),
            )?;

            outcomes.push(SweepOutcome {
                scaler: method,
                round,
                baseline_accuracy: fixed_eval.accuracy,
                tuned_accuracy: tuned_eval.accuracy,
                search: summary,
            });
        }
    }
    Ok(outcomes)
}

fn held_out(trained: &TrainedModel) -> Result<Evaluation> {
    let test = &trained.split.test;
    evaluate(&trained.model, test.features.view(), test.labels.view())
}

/// Tuned base models stacked under a logistic meta-learner
#[derive(Debug)]
pub struct EnsembleOutcome {
    pub scaler: FittedScaler,
    /// Grid result per base estimator, by estimator name
    pub base: Vec<(String, SearchSummary)>,
    pub model: FittedStacking,
    pub split: TrainTestSplit,
    pub evaluation: Evaluation,
}

impl Predictor for EnsembleOutcome {
    /// Predict from unscaled feature rows
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        let scaled = self.scaler.transform(x)?;
        self.model.predict(scaled.view())
    }
}

/// Tune each base classifier on the training split, stack the winners and
/// evaluate the stack on the held-out split
pub fn ensemble(config: &Config, data: &TrainingSet, scaler: ScalerKind) -> Result<EnsembleOutcome> {
    let (scaler, scaled) = scale(data, scaler)?;
    let mode = config.split.search_mode.with_seed(config.split.seed);
    let split = train_test_split(&scaled, config.split.test_fraction, mode)?;
    let (train, test) = (&split.train, &split.test);

    let mut estimators = Vec::with_capacity(ModelKind::ALL.len());
    let mut base = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let result = GridSearch::for_model(kind, config)?
            .run(train.features.view(), train.labels.view())?;
        let accuracy = result
            .best_model
            .score(test.features.view(), test.labels.view())?;
        log::info!(
            "{}: {} held-out accuracy {:.2}%",
            kind,
            result.summary.best_spec,
            accuracy * 100.0
        );

        estimators.push((kind.name().to_string(), result.summary.best_spec.clone()));
        base.push((kind.name().to_string(), result.summary));
    }

    let stacking = StackingClassifier::from_config(estimators, &config.ensemble)?;
    let model = stacking.fit(train.features.view(), train.labels.view())?;
    let evaluation = evaluate(&model, test.features.view(), test.labels.view())?;

    Ok(EnsembleOutcome {
        scaler,
        base,
        model,
        split,
        evaluation,
    })
}
