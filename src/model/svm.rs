//! Support vector classifier over `linfa-svm`

use std::fmt;
use std::str::FromStr;

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::model::{check_fit_input, check_predict_input, Predictor};
use crate::{GridironError, Result, SvmConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Linear,
    Rbf,
    Poly,
}

impl Kernel {
    pub fn tag(&self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Rbf => "rbf",
            Kernel::Poly => "poly",
        }
    }

    /// Whether `gamma` affects this kernel
    pub fn uses_gamma(&self) -> bool {
        matches!(self, Kernel::Rbf)
    }
}

impl FromStr for Kernel {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Kernel::Linear),
            "rbf" | "gaussian" => Ok(Kernel::Rbf),
            "poly" | "polynomial" => Ok(Kernel::Poly),
            "sigmoid" => Err(GridironError::Configuration(
                "sigmoid kernel is not supported. Use linear, rbf or poly.".to_string(),
            )),
            _ => Err(GridironError::Configuration(format!(
                "unknown SVM kernel '{}'. Use linear, rbf or poly.",
                s
            ))),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvmParams {
    pub kernel: Kernel,
    /// Penalty applied to both classes
    pub c: f64,
    /// RBF coefficient, `exp(-gamma * |x - y|^2)`
    pub gamma: f64,
    pub degree: u32,
}

impl SvmParams {
    pub fn from_config(config: &SvmConfig) -> Result<Self> {
        let params = SvmParams {
            kernel: config.kernel.parse()?,
            c: config.c,
            gamma: config.gamma,
            degree: config.degree,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(GridironError::Configuration(format!(
                "SVM C must be positive, got {}",
                self.c
            )));
        }
        if self.kernel.uses_gamma() && !(self.gamma > 0.0) {
            return Err(GridironError::Configuration(format!(
                "SVM gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.kernel == Kernel::Poly && self.degree == 0 {
            return Err(GridironError::Configuration(
                "polynomial kernel degree must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedSvm> {
        check_fit_input(x, y)?;
        self.validate()?;

        let targets: Array1<bool> = y.mapv(|class| class == 1);
        let dataset = Dataset::new(x.to_owned(), targets);

        let params = Svm::<f64, bool>::params().pos_neg_weights(self.c, self.c);
        let params = match self.kernel {
            Kernel::Linear => params.linear_kernel(),
            Kernel::Rbf => params.gaussian_kernel(1.0 / self.gamma),
            Kernel::Poly => params.polynomial_kernel(1.0, self.degree as f64),
        };

        let model = params.fit(&dataset).map_err(|e| GridironError::Model {
            model: self.to_string(),
            message: e.to_string(),
        })?;
        log::debug!("{} fitted with {} support vectors", self, model.nsupport());

        Ok(FittedSvm {
            params: self.clone(),
            n_features: x.ncols(),
            model,
        })
    }
}

impl fmt::Display for SvmParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kernel {
            Kernel::Rbf => write!(f, "SVM(kernel=rbf, C={}, gamma={})", self.c, self.gamma),
            Kernel::Poly => write!(f, "SVM(kernel=poly, C={}, degree={})", self.c, self.degree),
            Kernel::Linear => write!(f, "SVM(kernel=linear, C={})", self.c),
        }
    }
}

pub struct FittedSvm {
    params: SvmParams,
    n_features: usize,
    model: Svm<f64, bool>,
}

impl FittedSvm {
    pub fn params(&self) -> &SvmParams {
        &self.params
    }
}

impl fmt::Debug for FittedSvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedSvm")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl Predictor for FittedSvm {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        check_predict_input(x, self.n_features)?;
        let predicted: Array1<bool> = self.model.predict(&x);
        Ok(predicted.mapv(usize::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_classification;
    use crate::Config;

    #[test]
    fn test_kernel_parsing() {
        assert_eq!("RBF".parse::<Kernel>().unwrap(), Kernel::Rbf);
        assert_eq!("polynomial".parse::<Kernel>().unwrap(), Kernel::Poly);
        assert!(matches!(
            "sigmoid".parse::<Kernel>(),
            Err(GridironError::Configuration(_))
        ));
        assert!("tanh".parse::<Kernel>().is_err());
    }

    #[test]
    fn test_default_params() {
        let params = SvmParams::from_config(&Config::default().svm).unwrap();
        assert_eq!(params.kernel, Kernel::Rbf);
        assert_eq!(params.c, 10.0);
        assert_eq!(params.gamma, 0.001);
        assert_eq!(params.to_string(), "SVM(kernel=rbf, C=10, gamma=0.001)");
    }

    #[test]
    fn test_invalid_params() {
        let params = SvmParams {
            kernel: Kernel::Rbf,
            c: 0.0,
            gamma: 0.1,
            degree: 3,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_linear_svm_separates() {
        let (x, y) = synthetic_classification(120, 3, 7);
        let params = SvmParams {
            kernel: Kernel::Linear,
            c: 1.0,
            gamma: 0.1,
            degree: 3,
        };
        let model = params.fit(x.view(), y.view()).unwrap();
        let accuracy = model.score(x.view(), y.view()).unwrap();
        assert!(accuracy > 0.85, "accuracy {}", accuracy);
    }

    #[test]
    fn test_rbf_svm_predicts_both_classes() {
        let (x, y) = synthetic_classification(120, 2, 11);
        let params = SvmParams {
            kernel: Kernel::Rbf,
            c: 10.0,
            gamma: 0.5,
            degree: 3,
        };
        let model = params.fit(x.view(), y.view()).unwrap();
        let predicted = model.predict(x.view()).unwrap();
        assert_eq!(predicted.len(), 120);
        assert!(predicted.iter().any(|&c| c == 0));
        assert!(predicted.iter().any(|&c| c == 1));
    }
}
