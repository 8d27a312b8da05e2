//! Classifiers
//!
//! Four base classifiers behind one tagged specification:
//! - SVM: kernel support vector machine (`linfa-svm`)
//! - Logistic regression (`linfa-logistic`)
//! - Neural network: multi-layer perceptron (`burn`)
//! - Random forest: bagged decision trees (`linfa-trees`)
//!
//! plus a stacking ensemble over any named set of them.

pub mod ensemble;
pub mod forest;
pub mod logistic;
pub mod neural_net;
pub mod svm;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};

pub use ensemble::{FittedStacking, StackingClassifier};
pub use forest::{FittedForest, ForestParams};
pub use logistic::{FittedLogistic, LogisticParams};
pub use neural_net::{FittedNeuralNet, NeuralNetParams};
pub use svm::{FittedSvm, Kernel, SvmParams};

use crate::{Config, GridironError, Outcome, Result};

/// A fitted classifier mapping feature rows to class indices
pub trait Predictor {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>>;

    /// Mean accuracy on `(x, y)`
    fn score(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<f64> {
        let predicted = self.predict(x)?;
        if predicted.len() != y.len() || y.is_empty() {
            return Err(GridironError::DataShape(format!(
                "cannot score {} predictions against {} labels",
                predicted.len(),
                y.len()
            )));
        }
        let correct = predicted.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

/// Base classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Logistic,
    NeuralNet,
    RandomForest,
    Svm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Logistic,
        ModelKind::NeuralNet,
        ModelKind::RandomForest,
        ModelKind::Svm,
    ];

    /// Short name used in reports and as the ensemble estimator name
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "Log Reg",
            ModelKind::NeuralNet => "Nrl Net",
            ModelKind::RandomForest => "RForest",
            ModelKind::Svm => "SVM",
        }
    }
}

impl FromStr for ModelKind {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "logistic" | "logreg" | "log-reg" => Ok(ModelKind::Logistic),
            "nn" | "neural-net" | "mlp" => Ok(ModelKind::NeuralNet),
            "forest" | "rf" | "random-forest" => Ok(ModelKind::RandomForest),
            "svm" | "svc" => Ok(ModelKind::Svm),
            _ => Err(GridironError::Configuration(format!(
                "unknown model '{}'. Use svm, logistic, nn or forest.",
                s
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One concrete, unfitted classifier configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    Svm(SvmParams),
    Logistic(LogisticParams),
    NeuralNet(NeuralNetParams),
    RandomForest(ForestParams),
}

impl ModelSpec {
    /// The configured fixed hyperparameters for `kind`
    pub fn from_config(kind: ModelKind, config: &Config) -> Result<Self> {
        Ok(match kind {
            ModelKind::Svm => ModelSpec::Svm(SvmParams::from_config(&config.svm)?),
            ModelKind::Logistic => ModelSpec::Logistic(LogisticParams::from_config(&config.logistic)?),
            ModelKind::NeuralNet => {
                ModelSpec::NeuralNet(NeuralNetParams::from_config(&config.neural_net)?)
            }
            ModelKind::RandomForest => {
                ModelSpec::RandomForest(ForestParams::from_config(&config.random_forest)?)
            }
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelSpec::Svm(_) => ModelKind::Svm,
            ModelSpec::Logistic(_) => ModelKind::Logistic,
            ModelSpec::NeuralNet(_) => ModelKind::NeuralNet,
            ModelSpec::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::Svm(params) => params.validate(),
            ModelSpec::Logistic(params) => params.validate(),
            ModelSpec::NeuralNet(params) => params.validate(),
            ModelSpec::RandomForest(params) => params.validate(),
        }
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedModel> {
        Ok(match self {
            ModelSpec::Svm(params) => FittedModel::Svm(params.fit(x, y)?),
            ModelSpec::Logistic(params) => FittedModel::Logistic(params.fit(x, y)?),
            ModelSpec::NeuralNet(params) => FittedModel::NeuralNet(params.fit(x, y)?),
            ModelSpec::RandomForest(params) => FittedModel::RandomForest(params.fit(x, y)?),
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSpec::Svm(params) => write!(f, "{}", params),
            ModelSpec::Logistic(params) => write!(f, "{}", params),
            ModelSpec::NeuralNet(params) => write!(f, "{}", params),
            ModelSpec::RandomForest(params) => write!(f, "{}", params),
        }
    }
}

#[derive(Debug)]
pub enum FittedModel {
    Svm(FittedSvm),
    Logistic(FittedLogistic),
    NeuralNet(FittedNeuralNet),
    RandomForest(FittedForest),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Svm(_) => ModelKind::Svm,
            FittedModel::Logistic(_) => ModelKind::Logistic,
            FittedModel::NeuralNet(_) => ModelKind::NeuralNet,
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    /// Parameters the model was fitted with
    pub fn spec(&self) -> ModelSpec {
        match self {
            FittedModel::Svm(m) => ModelSpec::Svm(m.params().clone()),
            FittedModel::Logistic(m) => ModelSpec::Logistic(m.params().clone()),
            FittedModel::NeuralNet(m) => ModelSpec::NeuralNet(m.params().clone()),
            FittedModel::RandomForest(m) => ModelSpec::RandomForest(m.params().clone()),
        }
    }
}

impl Predictor for FittedModel {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        match self {
            FittedModel::Svm(m) => m.predict(x),
            FittedModel::Logistic(m) => m.predict(x),
            FittedModel::NeuralNet(m) => m.predict(x),
            FittedModel::RandomForest(m) => m.predict(x),
        }
    }
}

/// Shared preconditions for fitting: matching rows, binary labels with
/// both classes present
pub(crate) fn check_fit_input(x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(GridironError::DataShape(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(GridironError::DataShape(format!(
            "cannot fit on a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }

    let mut counts = [0usize; Outcome::COUNT];
    for &label in y.iter() {
        match counts.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                return Err(GridironError::DataShape(format!(
                    "label {} is not a binary class index",
                    label
                )))
            }
        }
    }
    if counts.iter().any(|&count| count == 0) {
        return Err(GridironError::DataShape(format!(
            "both classes must be present to fit, got counts {:?}",
            counts
        )));
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: ArrayView2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(GridironError::DataShape(format!(
            "model was fitted on {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}
