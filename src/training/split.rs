//! Train/test partitioning and stratified k-fold

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::TrainingSet;
use crate::{GridironError, Outcome, Result};

/// How rows are assigned to the held-out set (configuration form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Rows keep their season order; the most recent rows are held out
    Sequential,
    /// Seeded permutation before splitting
    Shuffled,
}

impl SplitStrategy {
    pub fn with_seed(self, seed: u64) -> SplitMode {
        match self {
            SplitStrategy::Sequential => SplitMode::Sequential,
            SplitStrategy::Shuffled => SplitMode::Shuffled { seed },
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = GridironError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(SplitStrategy::Sequential),
            "shuffled" | "shuffle" => Ok(SplitStrategy::Shuffled),
            _ => Err(GridironError::Configuration(format!(
                "unknown split mode '{}'. Use sequential or shuffled.",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Sequential,
    Shuffled { seed: u64 },
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Sequential => write!(f, "sequential"),
            SplitMode::Shuffled { seed } => write!(f, "shuffled (seed {})", seed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: TrainingSet,
    pub test: TrainingSet,
    /// Source row of each training row
    pub train_indices: Vec<usize>,
    /// Source row of each test row
    pub test_indices: Vec<usize>,
}

/// Split `data` holding out `ceil(test_fraction * n)` rows
pub fn train_test_split(
    data: &TrainingSet,
    test_fraction: f64,
    mode: SplitMode,
) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(GridironError::Configuration(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = data.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(GridironError::DataShape(format!(
            "test fraction {} of {} rows leaves an empty partition",
            test_fraction, n
        )));
    }

    let (train_indices, test_indices) = match mode {
        SplitMode::Sequential => ((0..n - n_test).collect(), (n - n_test..n).collect()),
        SplitMode::Shuffled { seed } => {
            let mut order: Vec<usize> = (0..n).collect();
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
            let train = order.split_off(n_test);
            (train, order)
        }
    };

    log::info!(
        "Split {} rows ({}): train={}, test={}",
        n,
        mode,
        train_indices.len(),
        test_indices.len()
    );

    Ok(TrainTestSplit {
        train: data.select(&train_indices),
        test: data.select(&test_indices),
        train_indices,
        test_indices,
    })
}

/// A `(train, validation)` pair of row indices
pub type Fold = (Vec<usize>, Vec<usize>);

/// Stratified k-fold without shuffling
///
/// Rows of each class are dealt round-robin across the folds in their
/// original order, so every fold keeps roughly the overall class balance.
/// Every class present needs at least `k` rows.
pub fn stratified_k_fold(labels: ArrayView1<usize>, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(GridironError::Configuration(format!(
            "k-fold needs at least 2 folds, got {}",
            k
        )));
    }
    if k > labels.len() {
        return Err(GridironError::DataShape(format!(
            "cannot make {} folds from {} rows",
            k,
            labels.len()
        )));
    }

    let mut assignment = vec![0usize; labels.len()];
    let mut seen = [0usize; Outcome::COUNT];
    for (row, &label) in labels.iter().enumerate() {
        let count = seen.get_mut(label).ok_or_else(|| {
            GridironError::DataShape(format!("label {} is not a binary class index", label))
        })?;
        assignment[row] = *count % k;
        *count += 1;
    }
    if let Some((class, &count)) = seen.iter().enumerate().find(|&(_, &c)| c > 0 && c < k) {
        return Err(GridironError::DataShape(format!(
            "class {} has {} rows, fewer than {} folds",
            class, count, k
        )));
    }

    let folds = (0..k)
        .map(|fold| {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&row| assignment[row] == fold);
            (train, validation)
        })
        .collect();
    Ok(folds)
}
