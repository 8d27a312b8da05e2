//! Feed-forward binary classifier
//!
//! Architecture: Input(d) → [Linear → ReLU] × hidden layers → Linear(1) → sigmoid
//!
//! Trained full-batch with Adam and L2 weight decay on the binary
//! cross-entropy of the home-win probability.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig};
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::model::{check_fit_input, check_predict_input, Predictor};
use crate::{GridironError, NeuralNetConfig, Result};

type InferenceBackend = NdArray<f32>;
type TrainingBackend = Autodiff<InferenceBackend>;

/// Probability threshold for predicting a home win
const DECISION_THRESHOLD: f32 = 0.5;

/// The backend RNG is process-wide; seeding and weight initialization run
/// under this lock
static BACKEND_RNG: Mutex<()> = Mutex::new(());

fn lock_backend_rng() -> MutexGuard<'static, ()> {
    BACKEND_RNG.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single hidden layer block: Linear → ReLU
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        relu(self.linear.forward(x))
    }
}

/// Multi-layer perceptron producing one win logit per row
#[derive(Module, Debug)]
pub struct ClassifierNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> ClassifierNet<B> {
    pub fn new(device: &B::Device, input_dim: usize, hidden_dims: &[usize]) -> Self {
        let mut hidden = Vec::with_capacity(hidden_dims.len());
        let mut in_dim = input_dim;
        for &out_dim in hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim));
            in_dim = out_dim;
        }

        ClassifierNet {
            hidden,
            output: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Forward pass, `[batch, input_dim]` → win logits `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.iter().fold(x, |x, block| block.forward(x));
        self.output.forward(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetParams {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub weight_decay: f64,
    /// Seeds the global backend RNG right before weight initialization.
    /// Concurrent fits with the same seed agree only because seeding and
    /// initialization share `BACKEND_RNG`; other draws from the backend RNG
    /// outside that lock make fits irreproducible.
    pub seed: u64,
}

impl NeuralNetParams {
    pub fn from_config(config: &NeuralNetConfig) -> Result<Self> {
        let params = NeuralNetParams {
            hidden_layers: config.hidden_layers.clone(),
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            weight_decay: config.weight_decay,
            seed: config.seed,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.iter().any(|&width| width == 0) {
            return Err(GridironError::Configuration(
                "hidden layer widths must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(GridironError::Configuration(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(GridironError::Configuration(
                "neural network needs at least one epoch".to_string(),
            ));
        }
        if self.weight_decay < 0.0 {
            return Err(GridironError::Configuration(format!(
                "weight decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        Ok(())
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedNeuralNet> {
        check_fit_input(x, y)?;
        self.validate()?;

        let device = Default::default();
        let mut model = {
            let _rng = lock_backend_rng();
            TrainingBackend::seed(self.seed);
            ClassifierNet::<TrainingBackend>::new(&device, x.ncols(), &self.hidden_layers)
        };
        let mut optimizer = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(self.weight_decay as f32)))
            .init();

        let inputs = features_tensor::<TrainingBackend>(x, &device);
        let targets = Tensor::<TrainingBackend, 2>::from_data(
            TensorData::new(y.iter().map(|&c| c as f32).collect::<Vec<_>>(), [y.len(), 1]),
            &device,
        );

        log::debug!("Training {} for {} epochs on {} rows", self, self.epochs, x.nrows());

        for epoch in 0..self.epochs {
            let probs = sigmoid(model.forward(inputs.clone()));
            let loss = binary_cross_entropy(probs, targets.clone());

            if epoch % 50 == 0 || epoch == self.epochs - 1 {
                let loss_val: f32 = loss.clone().into_scalar().elem();
                log::debug!("Epoch {}/{}: loss={:.4}", epoch + 1, self.epochs, loss_val);
            }

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.learning_rate, model, grads);
        }

        Ok(FittedNeuralNet {
            params: self.clone(),
            n_features: x.ncols(),
            model: model.valid(),
        })
    }
}

impl fmt::Display for NeuralNetParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeuralNet(hidden={:?}, lr={}, weight_decay={}, epochs={})",
            self.hidden_layers, self.learning_rate, self.weight_decay, self.epochs
        )
    }
}

/// Binary cross-entropy on probabilities, clamped away from 0 and 1
fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

fn features_tensor<B: Backend>(x: ArrayView2<f64>, device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = x.iter().map(|&v| v as f32).collect();
    Tensor::from_data(TensorData::new(values, [x.nrows(), x.ncols()]), device)
}

#[derive(Debug)]
pub struct FittedNeuralNet {
    params: NeuralNetParams,
    n_features: usize,
    model: ClassifierNet<InferenceBackend>,
}

impl FittedNeuralNet {
    pub fn params(&self) -> &NeuralNetParams {
        &self.params
    }

    /// Home-win probability per row
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_predict_input(x, self.n_features)?;
        let device = Default::default();
        let inputs = features_tensor::<InferenceBackend>(x, &device);
        let probs = sigmoid(self.model.forward(inputs))
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| GridironError::Model {
                model: self.params.to_string(),
                message: format!("{:?}", e),
            })?;
        Ok(probs.into_iter().map(f64::from).collect())
    }
}

impl Predictor for FittedNeuralNet {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| usize::from(p >= DECISION_THRESHOLD as f64)))
    }
}
