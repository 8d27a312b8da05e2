//! Exhaustive hyperparameter search with stratified cross-validation

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::model::{
    FittedModel, ForestParams, Kernel, LogisticParams, ModelKind, ModelSpec, NeuralNetParams,
    Predictor, SvmParams,
};
use crate::training::split::stratified_k_fold;
use crate::{Config, GridironError, Result};

#[derive(Debug, Clone)]
pub struct SvmGrid {
    pub kernels: Vec<Kernel>,
    pub c: Vec<f64>,
    /// Only crossed with kernels that use it
    pub gamma: Vec<f64>,
    pub degree: u32,
}

#[derive(Debug, Clone)]
pub struct LogisticGrid {
    pub c: Vec<f64>,
    pub max_iterations: u64,
}

#[derive(Debug, Clone)]
pub struct NeuralNetGrid {
    pub hidden_layers: Vec<Vec<usize>>,
    pub learning_rate: Vec<f64>,
    pub weight_decay: Vec<f64>,
    pub epochs: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct ForestGrid {
    pub n_trees: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: usize,
    pub max_features: Option<usize>,
    pub seed: u64,
}

/// Candidate values per hyperparameter for one model family
#[derive(Debug, Clone)]
pub enum ParamGrid {
    Svm(SvmGrid),
    Logistic(LogisticGrid),
    NeuralNet(NeuralNetGrid),
    RandomForest(ForestGrid),
}

fn require_axis<T>(values: &[T], model: ModelKind, axis: &str) -> Result<()> {
    if values.is_empty() {
        return Err(GridironError::Configuration(format!(
            "{} grid has no values for {}",
            model, axis
        )));
    }
    Ok(())
}

impl ParamGrid {
    /// The configured grid for `kind`; parameters outside the grid keep
    /// their fixed configured values
    pub fn for_model(kind: ModelKind, config: &Config) -> Result<Self> {
        let tuning = &config.tuning;
        Ok(match kind {
            ModelKind::Svm => ParamGrid::Svm(SvmGrid {
                kernels: tuning
                    .svm
                    .kernels
                    .iter()
                    .map(|k| k.parse())
                    .collect::<Result<Vec<Kernel>>>()?,
                c: tuning.svm.c.clone(),
                gamma: tuning.svm.gamma.clone(),
                degree: config.svm.degree,
            }),
            ModelKind::Logistic => ParamGrid::Logistic(LogisticGrid {
                c: tuning.logistic.c.clone(),
                max_iterations: config.logistic.max_iterations,
            }),
            ModelKind::NeuralNet => ParamGrid::NeuralNet(NeuralNetGrid {
                hidden_layers: tuning.neural_net.hidden_layers.clone(),
                learning_rate: tuning.neural_net.learning_rate.clone(),
                weight_decay: tuning.neural_net.weight_decay.clone(),
                epochs: config.neural_net.epochs,
                seed: config.neural_net.seed,
            }),
            ModelKind::RandomForest => ParamGrid::RandomForest(ForestGrid {
                n_trees: tuning.random_forest.n_trees.clone(),
                max_depth: tuning.random_forest.max_depth.clone(),
                min_samples_split: config.random_forest.min_samples_split,
                max_features: config.random_forest.max_features,
                seed: config.random_forest.seed,
            }),
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ParamGrid::Svm(_) => ModelKind::Svm,
            ParamGrid::Logistic(_) => ModelKind::Logistic,
            ParamGrid::NeuralNet(_) => ModelKind::NeuralNet,
            ParamGrid::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    /// Cartesian product of the grid axes, in axis order
    pub fn candidates(&self) -> Result<Vec<ModelSpec>> {
        let kind = self.kind();
        let mut specs = Vec::new();

        match self {
            ParamGrid::Svm(grid) => {
                require_axis(&grid.kernels, kind, "kernel")?;
                require_axis(&grid.c, kind, "C")?;
                for &kernel in &grid.kernels {
                    if kernel.uses_gamma() {
                        require_axis(&grid.gamma, kind, "gamma")?;
                    }
                    for &c in &grid.c {
                        let gammas: &[f64] = if kernel.uses_gamma() { &grid.gamma } else { &[0.0] };
                        for &gamma in gammas {
                            specs.push(ModelSpec::Svm(SvmParams {
                                kernel,
                                c,
                                gamma,
                                degree: grid.degree,
                            }));
                        }
                    }
                }
            }
            ParamGrid::Logistic(grid) => {
                require_axis(&grid.c, kind, "C")?;
                specs.extend(grid.c.iter().map(|&c| {
                    ModelSpec::Logistic(LogisticParams {
                        c,
                        max_iterations: grid.max_iterations,
                    })
                }));
            }
            ParamGrid::NeuralNet(grid) => {
                require_axis(&grid.hidden_layers, kind, "hidden layers")?;
                require_axis(&grid.learning_rate, kind, "learning rate")?;
                require_axis(&grid.weight_decay, kind, "weight decay")?;
                for hidden in &grid.hidden_layers {
                    for &learning_rate in &grid.learning_rate {
                        for &weight_decay in &grid.weight_decay {
                            specs.push(ModelSpec::NeuralNet(NeuralNetParams {
                                hidden_layers: hidden.clone(),
                                learning_rate,
                                epochs: grid.epochs,
                                weight_decay,
                                seed: grid.seed,
                            }));
                        }
                    }
                }
            }
            ParamGrid::RandomForest(grid) => {
                require_axis(&grid.n_trees, kind, "n_trees")?;
                require_axis(&grid.max_depth, kind, "max depth")?;
                for &n_trees in &grid.n_trees {
                    for &max_depth in &grid.max_depth {
                        specs.push(ModelSpec::RandomForest(ForestParams {
                            n_trees,
                            max_depth: Some(max_depth),
                            min_samples_split: grid.min_samples_split,
                            max_features: grid.max_features,
                            seed: grid.seed,
                        }));
                    }
                }
            }
        }

        for spec in &specs {
            spec.validate()?;
        }
        Ok(specs)
    }
}

/// Cross-validated accuracy of one candidate
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub spec: ModelSpec,
    pub fold_scores: Vec<f64>,
    /// NaN when the candidate failed to fit on some fold
    pub mean_score: f64,
}

/// What a search found, without the fitted model
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub best_spec: ModelSpec,
    /// Mean CV accuracy of `best_spec`
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

#[derive(Debug)]
pub struct GridSearchResult {
    /// The best candidate refit on every row given to the search
    pub best_model: FittedModel,
    pub summary: SearchSummary,
}

#[derive(Debug, Clone)]
pub struct GridSearch {
    pub grid: ParamGrid,
    pub cv_folds: usize,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, cv_folds: usize) -> Self {
        GridSearch { grid, cv_folds }
    }

    pub fn for_model(kind: ModelKind, config: &Config) -> Result<Self> {
        Ok(GridSearch::new(
            ParamGrid::for_model(kind, config)?,
            config.tuning.cv_folds,
        ))
    }

    /// Score every candidate and refit the best one
    ///
    /// The first candidate with the highest mean accuracy wins ties.
    /// Candidates whose fitting fails score NaN and are never selected.
    pub fn run(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<GridSearchResult> {
        let candidates = self.grid.candidates()?;
        let folds = stratified_k_fold(y, self.cv_folds)?;

        log::info!(
            "Grid search over {} {} candidates with {}-fold CV",
            candidates.len(),
            self.grid.kind(),
            self.cv_folds
        );

        let mut scores: Vec<CandidateScore> = Vec::with_capacity(candidates.len());
        let mut best: Option<usize> = None;

        for (index, spec) in candidates.into_iter().enumerate() {
            let fold_scores = match cross_validate(&spec, x, y, &folds) {
                Ok(fold_scores) => fold_scores,
                Err(GridironError::Model { model, message }) => {
                    log::warn!("Skipping {}: {}", model, message);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            let mean_score = if fold_scores.is_empty() {
                f64::NAN
            } else {
                fold_scores.iter().sum::<f64>() / fold_scores.len() as f64
            };
            log::debug!("{} → mean CV accuracy {:.4}", spec, mean_score);

            let improves = match best {
                None => mean_score.is_finite(),
                Some(b) => mean_score > scores[b].mean_score,
            };
            if improves {
                best = Some(index);
            }

            scores.push(CandidateScore {
                spec,
                fold_scores,
                mean_score,
            });
        }

        let best = best.ok_or_else(|| GridironError::Model {
            model: self.grid.kind().to_string(),
            message: "no grid candidate could be fitted".to_string(),
        })?;
        let best_spec = scores[best].spec.clone();
        let best_score = scores[best].mean_score;

        log::info!("Best: {} (CV accuracy {:.4})", best_spec, best_score);
        let best_model = best_spec.fit(x, y)?;

        Ok(GridSearchResult {
            best_model,
            summary: SearchSummary {
                best_spec,
                best_score,
                candidates: scores,
            },
        })
    }
}

fn cross_validate(
    spec: &ModelSpec,
    x: ArrayView2<f64>,
    y: ArrayView1<usize>,
    folds: &[(Vec<usize>, Vec<usize>)],
) -> Result<Vec<f64>> {
    folds
        .iter()
        .map(|(train, validation)| {
            let model = spec.fit(
                x.select(Axis(0), train).view(),
                y.select(Axis(0), train).view(),
            )?;
            model.score(
                x.select(Axis(0), validation).view(),
                y.select(Axis(0), validation).view(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_classification;

    #[test]
    fn test_default_svm_grid_size() {
        let grid = ParamGrid::for_model(ModelKind::Svm, &Config::default()).unwrap();
        // rbf: 5 C x 5 gamma; poly and linear: 5 C each
        assert_eq!(grid.candidates().unwrap().len(), 35);
    }

    #[test]
    fn test_default_grid_sizes() {
        let config = Config::default();
        let sizes: Vec<usize> = [ModelKind::Logistic, ModelKind::NeuralNet, ModelKind::RandomForest]
            .iter()
            .map(|&kind| {
                ParamGrid::for_model(kind, &config)
                    .unwrap()
                    .candidates()
                    .unwrap()
                    .len()
            })
            .collect();
        assert_eq!(sizes, vec![5, 8, 6]);
    }

    #[test]
    fn test_empty_axis_rejected() {
        let grid = ParamGrid::Logistic(LogisticGrid {
            c: vec![],
            max_iterations: 100,
        });
        assert!(matches!(
            grid.candidates(),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_sigmoid_kernel_rejected() {
        let mut config = Config::default();
        config.tuning.svm.kernels.push("sigmoid".to_string());
        assert!(matches!(
            ParamGrid::for_model(ModelKind::Svm, &config),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_search_picks_best_logistic() {
        let (x, y) = synthetic_classification(150, 3, 17);
        let search = GridSearch::new(
            ParamGrid::Logistic(LogisticGrid {
                c: vec![1e-4, 1.0, 100.0],
                max_iterations: 200,
            }),
            3,
        );
        let result = search.run(x.view(), y.view()).unwrap();
        let summary = &result.summary;

        assert_eq!(summary.candidates.len(), 3);
        for candidate in &summary.candidates {
            assert_eq!(candidate.fold_scores.len(), 3);
        }
        let max = summary
            .candidates
            .iter()
            .map(|c| c.mean_score)
            .fold(f64::MIN, f64::max);
        assert_eq!(summary.best_score, max);

        let first_best = summary
            .candidates
            .iter()
            .position(|c| c.mean_score == max)
            .unwrap();
        assert_eq!(summary.best_spec, summary.candidates[first_best].spec);
        assert_eq!(result.best_model.spec(), summary.best_spec);
    }
}
