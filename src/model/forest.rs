//! Random forest: bagged `linfa-trees` decision trees
//!
//! Each tree sees a bootstrap sample of the rows and a random subset of
//! the columns. Predictions are a majority vote; ties go to class 0.

use std::fmt;

use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{check_fit_input, check_predict_input, Predictor};
use crate::{GridironError, Outcome, RandomForestConfig, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Columns drawn per tree; `None` means the square root of the width
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl ForestParams {
    pub fn from_config(config: &RandomForestConfig) -> Result<Self> {
        let params = ForestParams {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features: config.max_features,
            seed: config.seed,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(GridironError::Configuration(
                "random forest needs at least one tree".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(GridironError::Configuration(
                "random forest max depth must be positive".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(GridironError::Configuration(format!(
                "min samples split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.max_features == Some(0) {
            return Err(GridironError::Configuration(
                "random forest max features must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn features_per_tree(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().round() as usize;
        self.max_features.unwrap_or(default).clamp(1, n_features)
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<usize>) -> Result<FittedForest> {
        check_fit_input(x, y)?;
        self.validate()?;

        let n_rows = x.nrows();
        let n_features = x.ncols();
        let per_tree = self.features_per_tree(n_features);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let tree_params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(self.max_depth)
            .min_weight_split(self.min_samples_split as f32);

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut columns = rand::seq::index::sample(&mut rng, n_features, per_tree).into_vec();
            columns.sort_unstable();

            let records = x.select(Axis(0), &rows).select(Axis(1), &columns);
            let targets = y.select(Axis(0), &rows);
            let tree = tree_params
                .fit(&Dataset::new(records, targets))
                .map_err(|e| GridironError::Model {
                    model: self.to_string(),
                    message: e.to_string(),
                })?;
            trees.push(ForestTree { columns, tree });
        }

        log::debug!("{} fitted, {} columns per tree", self, per_tree);

        Ok(FittedForest {
            params: self.clone(),
            n_features,
            trees,
        })
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomForest(n_trees={}, max_depth=", self.n_trees)?;
        match self.max_depth {
            Some(depth) => write!(f, "{}", depth)?,
            None => write!(f, "none")?,
        }
        write!(f, ", min_samples_split={})", self.min_samples_split)
    }
}

struct ForestTree {
    columns: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

pub struct FittedForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<ForestTree>,
}

impl FittedForest {
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Share of trees voting for each class, `[rows, classes]`
    pub fn vote_shares(&self, x: ArrayView2<f64>) -> Result<ndarray::Array2<f64>> {
        check_predict_input(x, self.n_features)?;
        let mut votes = ndarray::Array2::<f64>::zeros((x.nrows(), Outcome::COUNT));
        for member in &self.trees {
            let records = x.select(Axis(1), &member.columns);
            let predicted: Array1<usize> = member.tree.predict(&records);
            for (row, &class) in predicted.iter().enumerate() {
                if class < Outcome::COUNT {
                    votes[[row, class]] += 1.0;
                }
            }
        }
        votes /= self.trees.len() as f64;
        Ok(votes)
    }
}

impl fmt::Debug for FittedForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedForest")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .field("n_trees", &self.trees.len())
            .finish()
    }
}

impl Predictor for FittedForest {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        let shares = self.vote_shares(x)?;
        Ok(shares
            .rows()
            .into_iter()
            .map(|row| usize::from(row[1] > row[0]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_classification;
    use crate::Config;

    fn small_forest(seed: u64) -> ForestParams {
        ForestParams {
            n_trees: 15,
            max_depth: Some(4),
            min_samples_split: 2,
            max_features: Some(2),
            seed,
        }
    }

    #[test]
    fn test_default_params() {
        let params = ForestParams::from_config(&Config::default().random_forest).unwrap();
        assert_eq!(params.n_trees, 200);
        assert_eq!(params.features_per_tree(21), 5);
        assert_eq!(params.features_per_tree(1), 1);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = small_forest(1);
        params.n_trees = 0;
        assert!(params.validate().is_err());
        let mut params = small_forest(1);
        params.min_samples_split = 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_fit_predict() {
        let (x, y) = synthetic_classification(200, 3, 9);
        let model = small_forest(42).fit(x.view(), y.view()).unwrap();
        assert_eq!(model.n_trees(), 15);

        let shares = model.vote_shares(x.view()).unwrap();
        for row in shares.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(model.score(x.view(), y.view()).unwrap() > 0.8);
    }

    #[test]
    fn test_same_seed_same_votes() {
        let (x, y) = synthetic_classification(80, 4, 2);
        let first = small_forest(7).fit(x.view(), y.view()).unwrap();
        let second = small_forest(7).fit(x.view(), y.view()).unwrap();
        assert_eq!(
            first.vote_shares(x.view()).unwrap(),
            second.vote_shares(x.view()).unwrap()
        );
    }

    #[test]
    fn test_width_mismatch() {
        let (x, y) = synthetic_classification(40, 3, 4);
        let model = small_forest(1).fit(x.view(), y.view()).unwrap();
        let narrow = ndarray::Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            model.predict(narrow.view()),
            Err(GridironError::DataShape(_))
        ));
    }
}
