//! Feature/label construction across season transitions
//!
//! A transition pairs one season's statistics (features) with the next
//! season's game outcomes (labels). Transitions over a year range are
//! concatenated in year order into a single training set.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use ndarray::{concatenate, Array1, Array2, Axis};

use crate::data::cleaning::{clean_season, CleanedSeason};
use crate::data::franchise::{self, FranchiseId};
use crate::data::store::{SeasonBatch, SeasonStore};
use crate::features::team_stats::{SeasonTable, TeamProfile};
use crate::{GridironError, Result};

/// Feature blocks in row order, each `TeamProfile::DIM` wide
const PROFILE_BLOCKS: [&str; 4] = ["home_prior", "away_prior", "home_form", "away_form"];

/// Width of every feature row: four team profiles plus the week number
pub const FEATURE_DIM: usize = PROFILE_BLOCKS.len() * TeamProfile::DIM + 1;

/// Column names matching `FEATURE_DIM`
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = PROFILE_BLOCKS
        .iter()
        .flat_map(|block| {
            TeamProfile::NAMES
                .iter()
                .map(move |stat| format!("{}_{}", block, stat))
        })
        .collect();
    names.push("week".to_string());
    names
}

/// Feature matrix and parallel label vector
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub labels: Array1<usize>,
}

impl TrainingSet {
    pub fn new(features: Array2<f64>, labels: Array1<usize>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(GridironError::DataShape(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        Ok(TrainingSet { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Stack another set below this one
    pub fn concat(&self, other: &TrainingSet) -> Result<Self> {
        if self.n_features() != other.n_features() {
            return Err(GridironError::DataShape(format!(
                "cannot stack {} features onto {}",
                other.n_features(),
                self.n_features()
            )));
        }

        let features = concatenate(Axis(0), &[self.features.view(), other.features.view()])
            .map_err(|e| GridironError::DataShape(e.to_string()))?;
        let labels = concatenate(Axis(0), &[self.labels.view(), other.labels.view()])
            .map_err(|e| GridironError::DataShape(e.to_string()))?;
        TrainingSet::new(features, labels)
    }

    /// Rows at the given indices, in that order
    pub fn select(&self, indices: &[usize]) -> TrainingSet {
        TrainingSet {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Number of rows per class label
    pub fn class_counts(&self, n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];
        for &label in &self.labels {
            if label < n_classes {
                counts[label] += 1;
            }
        }
        counts
    }

    /// Write `feature_names()` plus a label column
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = feature_names();
        if header.len() != self.n_features() {
            header = (0..self.n_features()).map(|i| format!("f{}", i)).collect();
        }
        header.push("label".to_string());
        writer.write_record(&header)?;

        for (row, label) in self.features.rows().into_iter().zip(&self.labels) {
            let mut record: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
            record.push(label.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Features and labels for one season transition
///
/// `previous` supplies last season's profiles, `next` the in-season form
/// from earlier weeks, and `next_raw` the games to label. Team names in
/// `next_raw` are resolved for `next_year`.
pub fn season_transition(
    previous: &CleanedSeason,
    next: &CleanedSeason,
    next_raw: &SeasonBatch,
    next_year: i32,
) -> Result<TrainingSet> {
    if next.year != next_year || next_raw.year != next_year || previous.year >= next_year {
        return Err(GridironError::DataShape(format!(
            "inconsistent transition: previous={}, next={}, raw={}, year={}",
            previous.year, next.year, next_raw.year, next_year
        )));
    }

    let prior = SeasonTable::from_games(&previous.games);
    let league = prior.league_average();

    let mut schedule: Vec<_> = next_raw
        .games
        .iter()
        .filter(|g| g.season == next_year)
        .collect();
    schedule.sort_by_key(|g| (g.week, g.date));

    let mut form = SeasonTable::new();
    let mut cursor = 0;
    let mut seen: HashSet<(NaiveDate, FranchiseId, FranchiseId)> = HashSet::new();
    let mut rows: Vec<f64> = Vec::with_capacity(schedule.len() * FEATURE_DIM);
    let mut labels: Vec<usize> = Vec::with_capacity(schedule.len());
    let mut ties = 0;

    for record in schedule {
        let Some(outcome) = record.outcome() else {
            if record.is_played() {
                ties += 1;
            }
            continue;
        };

        let home = franchise::resolve(&record.home_team, next_year);
        let away = franchise::resolve(&record.away_team, next_year);
        if home == away || !seen.insert((record.date, home.clone(), away.clone())) {
            continue;
        }

        // Form only counts weeks strictly before this game
        while cursor < next.games.len() && next.games[cursor].week < record.week {
            form.add_game(&next.games[cursor]);
            cursor += 1;
        }

        let home_prior = prior.profile_or(&home, league);
        let away_prior = prior.profile_or(&away, league);
        let home_form = form.profile_or(&home, home_prior);
        let away_form = form.profile_or(&away, away_prior);

        for profile in [home_prior, away_prior, home_form, away_form] {
            rows.extend(profile.to_array());
        }
        rows.push(record.week as f64);
        labels.push(outcome.class_index());
    }

    if ties > 0 {
        log::debug!("Season {}: skipped {} tied games", next_year, ties);
    }

    let features = Array2::from_shape_vec((labels.len(), FEATURE_DIM), rows)
        .map_err(|e| GridironError::DataShape(e.to_string()))?;
    TrainingSet::new(features, Array1::from(labels))
}

/// Build the training set for every transition in `start_year..=end_year`
pub fn build_training_set(
    store: &SeasonStore,
    start_year: i32,
    end_year: i32,
) -> Result<TrainingSet> {
    if end_year < start_year {
        return Err(GridironError::Configuration(format!(
            "invalid year range {}..{}",
            start_year, end_year
        )));
    }
    if end_year == start_year {
        return Err(GridironError::DataShape(format!(
            "year range {}..{} contains no season transitions",
            start_year, end_year
        )));
    }

    let batches = store.read_range(start_year, end_year)?;
    build_from_batches(&batches)
}

/// Fold transitions over consecutive raw batches (at least two)
pub fn build_from_batches(batches: &[SeasonBatch]) -> Result<TrainingSet> {
    if batches.len() < 2 {
        return Err(GridironError::DataShape(
            "at least two seasons are needed for a transition".to_string(),
        ));
    }

    // Clean each season once; inner seasons take part in two transitions
    let seasons: Vec<(&SeasonBatch, CleanedSeason)> =
        batches.iter().map(|batch| (batch, clean_season(batch))).collect();

    let mut transitions = seasons.windows(2).map(|pair| {
        let (_, previous) = &pair[0];
        let (next_raw, next) = &pair[1];
        season_transition(previous, next, next_raw, next_raw.year)
    });

    let first = match transitions.next() {
        Some(first) => first?,
        None => {
            return Err(GridironError::DataShape(
                "no season transitions to accumulate".to_string(),
            ))
        }
    };
    let set = transitions.try_fold(first, |acc, transition| acc.concat(&transition?))?;

    if set.is_empty() {
        return Err(GridironError::DataShape(format!(
            "seasons {}..{} produced no labelled games",
            batches[0].year,
            batches[batches.len() - 1].year
        )));
    }

    log::info!(
        "Built {} rows x {} features from {} season transitions",
        set.len(),
        set.n_features(),
        batches.len() - 1
    );
    Ok(set)
}
