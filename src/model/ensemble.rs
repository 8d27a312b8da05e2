//! Two-level stacking ensemble
//!
//! Base classifiers are fit on k-1 folds and predict the held-out fold,
//! giving every training row one out-of-fold prediction per estimator.
//! A logistic regression learns to combine those predictions; the base
//! classifiers are then refit on all rows for scoring.

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::model::logistic::{FittedLogistic, LogisticParams};
use crate::model::{check_fit_input, FittedModel, ModelSpec, Predictor};
use crate::training::split::stratified_k_fold;
use crate::{EnsembleConfig, GridironError, Result};

#[derive(Debug, Clone)]
pub struct StackingClassifier {
    estimators: Vec<(String, ModelSpec)>,
    meta: LogisticParams,
    cv_folds: usize,
}

impl StackingClassifier {
    pub fn new(
        estimators: Vec<(String, ModelSpec)>,
        meta: LogisticParams,
        cv_folds: usize,
    ) -> Result<Self> {
        if estimators.is_empty() {
            return Err(GridironError::Configuration(
                "stacking needs at least one base estimator".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for (name, spec) in &estimators {
            if !names.insert(name.as_str()) {
                return Err(GridironError::Configuration(format!(
                    "duplicate estimator name '{}'",
                    name
                )));
            }
            spec.validate()?;
        }
        meta.validate()?;

        if cv_folds < 2 {
            return Err(GridironError::Configuration(format!(
                "stacking needs at least 2 folds, got {}",
                cv_folds
            )));
        }

        Ok(StackingClassifier {
            estimators,
            meta,
            cv_folds,
        })
    }

    pub fn from_config(estimators: Vec<(String, ModelSpec)>, config: &EnsembleConfig) -> Result<Self> {
        let meta = LogisticParams {
            c: config.meta_c,
            max_iterations: config.meta_max_iterations,
        };
        Self::new(estimators, meta, config.cv_folds)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.estimators.iter().map(|(name, _)| name.as_str())
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedStacking> {
        check_fit_input(x, y)?;
        let folds = stratified_k_fold(y, self.cv_folds)?;

        let mut meta_features = Array2::<f64>::zeros((x.nrows(), self.estimators.len()));
        for (column, (name, spec)) in self.estimators.iter().enumerate() {
            log::info!("Stacking: out-of-fold predictions for {}", name);
            for (train, validation) in &folds {
                let model = spec.fit(
                    x.select(Axis(0), train).view(),
                    y.select(Axis(0), train).view(),
                )?;
                let predicted = model.predict(x.select(Axis(0), validation).view())?;
                for (&row, &class) in validation.iter().zip(predicted.iter()) {
                    meta_features[[row, column]] = class as f64;
                }
            }
        }

        let meta = self.meta.fit(meta_features.view(), y)?;

        let base = self
            .estimators
            .iter()
            .map(|(name, spec)| {
                log::info!("Stacking: refitting {} on {} rows", name, x.nrows());
                Ok((name.clone(), spec.fit(x, y)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedStacking { base, meta })
    }
}

#[derive(Debug)]
pub struct FittedStacking {
    base: Vec<(String, FittedModel)>,
    meta: FittedLogistic,
}

impl FittedStacking {
    pub fn base_models(&self) -> &[(String, FittedModel)] {
        &self.base
    }

    /// Base predictions as meta-learner input, one column per estimator
    pub fn base_predictions(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut columns = Array2::<f64>::zeros((x.nrows(), self.base.len()));
        for (mut column, (_, model)) in columns.axis_iter_mut(Axis(1)).zip(&self.base) {
            let predicted = model.predict(x)?;
            column.assign(&predicted.mapv(|class| class as f64));
        }
        Ok(columns)
    }
}

impl Predictor for FittedStacking {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        let stacked = self.base_predictions(x)?;
        self.meta.predict(stacked.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForestParams, Kernel, SvmParams};
    use crate::testing::synthetic_classification;

    fn meta() -> LogisticParams {
        LogisticParams {
            c: 1.0,
            max_iterations: 100,
        }
    }

    fn estimators() -> Vec<(String, ModelSpec)> {
        vec![
            ("Log Reg".to_string(), ModelSpec::Logistic(meta())),
            (
                "RForest".to_string(),
                ModelSpec::RandomForest(ForestParams {
                    n_trees: 10,
                    max_depth: Some(3),
                    min_samples_split: 2,
                    max_features: None,
                    seed: 1,
                }),
            ),
            (
                "SVM".to_string(),
                ModelSpec::Svm(SvmParams {
                    kernel: Kernel::Linear,
                    c: 1.0,
                    gamma: 0.1,
                    degree: 3,
                }),
            ),
        ]
    }

    #[test]
    fn test_empty_estimators_rejected() {
        assert!(matches!(
            StackingClassifier::new(vec![], meta(), 5),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut list = estimators();
        list.push(("SVM".to_string(), ModelSpec::Logistic(meta())));
        assert!(matches!(
            StackingClassifier::new(list, meta(), 5),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_fit_predict() {
        let (x, y) = synthetic_classification(150, 3, 12);
        let stacking = StackingClassifier::new(estimators(), meta(), 3).unwrap();
        assert_eq!(stacking.names().collect::<Vec<_>>(), vec!["Log Reg", "RForest", "SVM"]);

        let fitted = stacking.fit(x.view(), y.view()).unwrap();
        assert_eq!(fitted.base_models().len(), 3);

        let stacked = fitted.base_predictions(x.view()).unwrap();
        assert_eq!(stacked.dim(), (150, 3));
        assert!(stacked.iter().all(|&v| v == 0.0 || v == 1.0));

        let accuracy = fitted.score(x.view(), y.view()).unwrap();
        assert!(accuracy > 0.8, "accuracy {}", accuracy);
    }
}
