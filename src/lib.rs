//! Football game outcome prediction
//!
//! Per-season game records are cleaned into feature/label pairs spanning
//! consecutive seasons, classical classifiers are tuned individually and
//! combined with a stacking ensemble.

pub mod data;
pub mod features;
pub mod model;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::training::split::SplitStrategy;

/// A single game as stored in a season file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub season: i32,
    pub week: u8,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_points: Option<u16>,
    pub away_points: Option<u16>,
    pub home_yards: Option<u16>,
    pub away_yards: Option<u16>,
    pub home_turnovers: Option<u8>,
    pub away_turnovers: Option<u8>,
    pub home_first_downs: Option<u8>,
    pub away_first_downs: Option<u8>,
}

impl GameRecord {
    /// A game counts as played once both final scores are known
    pub fn is_played(&self) -> bool {
        self.home_points.is_some() && self.away_points.is_some()
    }

    /// Score margin (positive = home win)
    pub fn margin(&self) -> Option<i32> {
        match (self.home_points, self.away_points) {
            (Some(home), Some(away)) => Some(home as i32 - away as i32),
            _ => None,
        }
    }

    /// Final outcome, or None for unplayed and tied games
    pub fn outcome(&self) -> Option<Outcome> {
        match self.margin()?.cmp(&0) {
            std::cmp::Ordering::Greater => Some(Outcome::HomeWin),
            std::cmp::Ordering::Less => Some(Outcome::AwayWin),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Class label predicted by every model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    AwayWin,
    HomeWin,
}

impl Outcome {
    pub const COUNT: usize = 2;

    pub fn class_index(self) -> usize {
        match self {
            Outcome::AwayWin => 0,
            Outcome::HomeWin => 1,
        }
    }

    pub fn from_class(class: usize) -> Option<Self> {
        match class {
            0 => Some(Outcome::AwayWin),
            1 => Some(Outcome::HomeWin),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AwayWin => write!(f, "away win"),
            Outcome::HomeWin => write!(f, "home win"),
        }
    }
}

/// Per-class metric names, used in `UndefinedMetric` errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Precision,
    Recall,
    F1,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Precision => write!(f, "precision"),
            MetricKind::Recall => write!(f, "recall"),
            MetricKind::F1 => write!(f, "F1"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("{metric} is undefined for class {class}: {reason}")]
    UndefinedMetric {
        class: usize,
        metric: MetricKind,
        reason: &'static str,
    },

    #[error("Season {0} not found in store")]
    SeasonNotFound(i32),

    #[error("Fitting {model} failed: {message}")]
    Model { model: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub seasons: SeasonConfig,
    pub preprocessing: PreprocessingConfig,
    pub split: SplitConfig,
    pub svm: SvmConfig,
    pub logistic: LogisticConfig,
    pub neural_net: NeuralNetConfig,
    pub random_forest: RandomForestConfig,
    pub tuning: TuningConfig,
    pub ensemble: EnsembleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one `season_<year>.csv` per season
    pub store_dir: String,
    /// Append-only metrics log
    pub report_path: String,
}

/// Inclusive season range; every adjacent pair is one transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub start_year: i32,
    pub end_year: i32,
}

impl SeasonConfig {
    pub fn transitions(&self) -> usize {
        (self.end_year - self.start_year).max(0) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// One of quantile, gaussian, robust, minmax, standard
    pub scaler: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Held-out fraction, strictly between 0 and 1
    pub test_fraction: f64,
    /// Split used when fitting fixed hyperparameters
    pub fixed_mode: SplitStrategy,
    /// Split used before a grid search
    pub search_mode: SplitStrategy,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmConfig {
    /// linear, rbf or poly
    pub kernel: String,
    pub c: f64,
    pub gamma: f64,
    pub degree: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iterations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNetConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub weight_decay: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub n_trees: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features considered per tree (defaults to sqrt of the feature count)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    pub cv_folds: usize,
    pub svm: SvmGridConfig,
    pub logistic: LogisticGridConfig,
    pub neural_net: NeuralNetGridConfig,
    pub random_forest: ForestGridConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmGridConfig {
    pub kernels: Vec<String>,
    pub c: Vec<f64>,
    pub gamma: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticGridConfig {
    pub c: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNetGridConfig {
    pub hidden_layers: Vec<Vec<usize>>,
    pub learning_rate: Vec<f64>,
    pub weight_decay: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestGridConfig {
    pub n_trees: Vec<usize>,
    pub max_depth: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Folds used to produce out-of-fold base predictions
    pub cv_folds: usize,
    pub meta_c: f64,
    pub meta_max_iterations: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                store_dir: "data/seasons".to_string(),
                report_path: "reports/metrics.txt".to_string(),
            },
            seasons: SeasonConfig {
                start_year: 2003,
                end_year: 2019,
            },
            preprocessing: PreprocessingConfig {
                scaler: "quantile".to_string(),
            },
            split: SplitConfig {
                test_fraction: 0.25,
                fixed_mode: SplitStrategy::Sequential,
                search_mode: SplitStrategy::Shuffled,
                seed: 42,
            },
            svm: SvmConfig {
                kernel: "rbf".to_string(),
                c: 10.0,
                gamma: 0.001,
                degree: 3,
            },
            logistic: LogisticConfig {
                c: 1.0,
                max_iterations: 200,
            },
            neural_net: NeuralNetConfig {
                hidden_layers: vec![64, 32],
                learning_rate: 1e-3,
                epochs: 300,
                weight_decay: 1e-4,
                seed: 42,
            },
            random_forest: RandomForestConfig {
                n_trees: 200,
                max_depth: Some(8),
                min_samples_split: 2,
                max_features: None,
                seed: 42,
            },
            tuning: TuningConfig {
                cv_folds: 5,
                svm: SvmGridConfig {
                    kernels: vec!["rbf".to_string(), "poly".to_string(), "linear".to_string()],
                    c: vec![0.1, 1.0, 10.0, 100.0, 1000.0],
                    gamma: vec![1.0, 0.1, 0.01, 0.001, 0.0001],
                },
                logistic: LogisticGridConfig {
                    c: vec![0.01, 0.1, 1.0, 10.0, 100.0],
                },
                neural_net: NeuralNetGridConfig {
                    hidden_layers: vec![vec![32], vec![64, 32]],
                    learning_rate: vec![1e-3, 1e-2],
                    weight_decay: vec![1e-4, 1e-3],
                },
                random_forest: ForestGridConfig {
                    n_trees: vec![100, 200],
                    max_depth: vec![4, 8, 12],
                },
            },
            ensemble: EnsembleConfig {
                cv_folds: 5,
                meta_c: 1.0,
                meta_max_iterations: 200,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            GridironError::Configuration(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            GridironError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings no component could run with
    pub fn validate(&self) -> Result<()> {
        if self.seasons.end_year < self.seasons.start_year {
            return Err(GridironError::Configuration(format!(
                "end year {} is before start year {}",
                self.seasons.end_year, self.seasons.start_year
            )));
        }
        let fraction = self.split.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(GridironError::Configuration(format!(
                "test fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if self.tuning.cv_folds < 2 || self.ensemble.cv_folds < 2 {
            return Err(GridironError::Configuration(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(home_points: Option<u16>, away_points: Option<u16>) -> GameRecord {
        GameRecord {
            season: 2019,
            week: 1,
            date: NaiveDate::from_ymd_opt(2019, 9, 8).unwrap(),
            home_team: "Chicago Bears".to_string(),
            away_team: "Green Bay Packers".to_string(),
            home_points,
            away_points,
            home_yards: None,
            away_yards: None,
            home_turnovers: None,
            away_turnovers: None,
            home_first_downs: None,
            away_first_downs: None,
        }
    }

    #[test]
    fn test_outcome() {
        assert_eq!(game(Some(24), Some(10)).outcome(), Some(Outcome::HomeWin));
        assert_eq!(game(Some(3), Some(10)).outcome(), Some(Outcome::AwayWin));
        assert_eq!(game(Some(17), Some(17)).outcome(), None);
        assert_eq!(game(None, None).outcome(), None);
        assert!(!game(Some(7), None).is_played());
    }

    #[test]
    fn test_outcome_class_index() {
        for class in 0..Outcome::COUNT {
            let outcome = Outcome::from_class(class).unwrap();
            assert_eq!(outcome.class_index(), class);
        }
        assert!(Outcome::from_class(2).is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seasons.transitions(), 16);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.svm.c, 10.0);
        assert_eq!(parsed.split.fixed_mode, SplitStrategy::Sequential);
        assert_eq!(parsed.split.search_mode, SplitStrategy::Shuffled);
        assert_eq!(parsed.random_forest.max_depth, Some(8));
        assert_eq!(parsed.random_forest.max_features, None);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = Config::default();
        config.seasons.end_year = 2001;
        assert!(matches!(
            config.validate(),
            Err(GridironError::Configuration(_))
        ));

        let mut config = Config::default();
        config.split.test_fraction = 1.0;
        assert!(matches!(
            config.validate(),
            Err(GridironError::Configuration(_))
        ));

        let mut config = Config::default();
        config.tuning.cv_folds = 1;
        assert!(config.validate().is_err());
    }
}
