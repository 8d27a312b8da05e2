//! L2-regularised logistic regression over `linfa-logistic`

use std::fmt;

use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::model::{check_fit_input, check_predict_input, Predictor};
use crate::{GridironError, LogisticConfig, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticParams {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iterations: u64,
}

impl LogisticParams {
    pub fn from_config(config: &LogisticConfig) -> Result<Self> {
        let params = LogisticParams {
            c: config.c,
            max_iterations: config.max_iterations,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(GridironError::Configuration(format!(
                "logistic regression C must be positive, got {}",
                self.c
            )));
        }
        if self.max_iterations == 0 {
            return Err(GridironError::Configuration(
                "logistic regression needs at least one iteration".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedLogistic> {
        check_fit_input(x, y)?;
        self.validate()?;

        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let model = LogisticRegression::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iterations)
            .fit(&dataset)
            .map_err(|e| GridironError::Model {
                model: self.to_string(),
                message: e.to_string(),
            })?;

        Ok(FittedLogistic {
            params: self.clone(),
            n_features: x.ncols(),
            model,
        })
    }
}

impl fmt::Display for LogisticParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogisticRegression(C={}, max_iter={})",
            self.c, self.max_iterations
        )
    }
}

pub struct FittedLogistic {
    params: LogisticParams,
    n_features: usize,
    model: FittedLogisticRegression<f64, usize>,
}

impl FittedLogistic {
    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    /// Probability of class 1 for each row
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_predict_input(x, self.n_features)?;
        let positive = self.model.predict_probabilities(&x);
        // linfa reports the probability of its own positive label
        if self.model.labels().pos.class == 1 {
            Ok(positive)
        } else {
            Ok(positive.mapv(|p| 1.0 - p))
        }
    }
}

impl fmt::Debug for FittedLogistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedLogistic")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl Predictor for FittedLogistic {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        check_predict_input(x, self.n_features)?;
        Ok(self.model.predict(&x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_classification;
    use crate::Config;

    #[test]
    fn test_from_config() {
        let params = LogisticParams::from_config(&Config::default().logistic).unwrap();
        assert_eq!(params.c, 1.0);
        assert_eq!(params.max_iterations, 200);
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let params = LogisticParams {
            c: -1.0,
            max_iterations: 100,
        };
        assert!(matches!(
            params.validate(),
            Err(GridironError::Configuration(_))
        ));
    }

    #[test]
    fn test_fit_predict() {
        let (x, y) = synthetic_classification(200, 4, 3);
        let params = LogisticParams {
            c: 1.0,
            max_iterations: 200,
        };
        let model = params.fit(x.view(), y.view()).unwrap();
        assert!(model.score(x.view(), y.view()).unwrap() > 0.85);

        let proba = model.predict_proba(x.view()).unwrap();
        let predicted = model.predict(x.view()).unwrap();
        for (p, class) in proba.iter().zip(predicted.iter()) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(*class, usize::from(*p >= 0.5));
        }
    }

    #[test]
    fn test_single_class_rejected() {
        let (x, _) = synthetic_classification(20, 2, 1);
        let y = Array1::<usize>::ones(20);
        let params = LogisticParams {
            c: 1.0,
            max_iterations: 50,
        };
        assert!(matches!(
            params.fit(x.view(), y.view()),
            Err(GridironError::DataShape(_))
        ));
    }
}
