//! Season cleaning
//!
//! Normalizes a raw season batch into a fixed-schema numeric table with
//! one row per played game and resolved franchises.

use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::Array2;

use crate::data::franchise::{self, FranchiseId};
use crate::data::store::SeasonBatch;
use crate::GameRecord;

/// Numeric columns of a cleaned season, in matrix order
pub const GAME_COLUMNS: [&str; 9] = [
    "week",
    "home_points",
    "away_points",
    "home_yards",
    "away_yards",
    "home_turnovers",
    "away_turnovers",
    "home_first_downs",
    "away_first_downs",
];

/// A played game with every numeric column filled in
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedGame {
    pub week: u8,
    pub date: NaiveDate,
    pub home: FranchiseId,
    pub away: FranchiseId,
    pub home_points: f64,
    pub away_points: f64,
    pub home_yards: f64,
    pub away_yards: f64,
    pub home_turnovers: f64,
    pub away_turnovers: f64,
    pub home_first_downs: f64,
    pub away_first_downs: f64,
}

impl CleanedGame {
    /// Row in `GAME_COLUMNS` order
    pub fn to_row(&self) -> [f64; GAME_COLUMNS.len()] {
        [
            self.week as f64,
            self.home_points,
            self.away_points,
            self.home_yards,
            self.away_yards,
            self.home_turnovers,
            self.away_turnovers,
            self.home_first_downs,
            self.away_first_downs,
        ]
    }

    pub fn involves(&self, team: &FranchiseId) -> bool {
        &self.home == team || &self.away == team
    }
}

/// A cleaned season, sorted by (week, date, home)
#[derive(Debug, Clone)]
pub struct CleanedSeason {
    pub year: i32,
    pub games: Vec<CleanedGame>,
}

impl CleanedSeason {
    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Numeric table with `GAME_COLUMNS.len()` columns
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.games.len(), GAME_COLUMNS.len()));
        for (mut row, game) in matrix.rows_mut().into_iter().zip(&self.games) {
            for (cell, value) in row.iter_mut().zip(game.to_row()) {
                *cell = value;
            }
        }
        matrix
    }
}

/// What the cleaner removed or filled in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningSummary {
    pub wrong_season: usize,
    pub unplayed: usize,
    pub self_matches: usize,
    pub duplicates: usize,
    pub imputed_values: usize,
}

/// Clean a raw season batch
pub fn clean_season(batch: &SeasonBatch) -> CleanedSeason {
    clean_season_with_summary(batch).0
}

pub fn clean_season_with_summary(batch: &SeasonBatch) -> (CleanedSeason, CleaningSummary) {
    let mut summary = CleaningSummary::default();
    let mut seen: HashSet<(NaiveDate, FranchiseId, FranchiseId)> = HashSet::new();
    let mut kept: Vec<(&GameRecord, FranchiseId, FranchiseId)> = Vec::new();

    for record in &batch.games {
        if record.season != batch.year {
            summary.wrong_season += 1;
            continue;
        }
        if !record.is_played() {
            summary.unplayed += 1;
            continue;
        }

        let home = franchise::resolve(&record.home_team, batch.year);
        let away = franchise::resolve(&record.away_team, batch.year);
        if home == away {
            summary.self_matches += 1;
            continue;
        }
        if !seen.insert((record.date, home.clone(), away.clone())) {
            summary.duplicates += 1;
            continue;
        }

        kept.push((record, home, away));
    }

    let means = ColumnMeans::from_records(kept.iter().map(|(r, _, _)| *r));

    let mut games: Vec<CleanedGame> = kept
        .into_iter()
        .map(|(record, home, away)| {
            let mut fill = |value: Option<f64>, mean: f64| {
                value.unwrap_or_else(|| {
                    summary.imputed_values += 1;
                    mean
                })
            };

            CleanedGame {
                week: record.week,
                date: record.date,
                home,
                away,
                home_points: record.home_points.unwrap_or_default() as f64,
                away_points: record.away_points.unwrap_or_default() as f64,
                home_yards: fill(record.home_yards.map(f64::from), means.yards),
                away_yards: fill(record.away_yards.map(f64::from), means.yards),
                home_turnovers: fill(record.home_turnovers.map(f64::from), means.turnovers),
                away_turnovers: fill(record.away_turnovers.map(f64::from), means.turnovers),
                home_first_downs: fill(record.home_first_downs.map(f64::from), means.first_downs),
                away_first_downs: fill(record.away_first_downs.map(f64::from), means.first_downs),
            }
        })
        .collect();

    games.sort_by(|a, b| {
        (a.week, a.date, &a.home.0).cmp(&(b.week, b.date, &b.home.0))
    });

    log::debug!(
        "Season {}: kept {} of {} games (unplayed={}, duplicates={}, self={}, other season={}, imputed={})",
        batch.year,
        games.len(),
        batch.games.len(),
        summary.unplayed,
        summary.duplicates,
        summary.self_matches,
        summary.wrong_season,
        summary.imputed_values
    );

    (
        CleanedSeason {
            year: batch.year,
            games,
        },
        summary,
    )
}

/// Season means of the optional box-score columns
struct ColumnMeans {
    yards: f64,
    turnovers: f64,
    first_downs: f64,
}

impl ColumnMeans {
    fn from_records<'a>(records: impl Iterator<Item = &'a GameRecord>) -> Self {
        let mut yards = Vec::new();
        let mut turnovers = Vec::new();
        let mut first_downs = Vec::new();

        for record in records {
            yards.extend([record.home_yards, record.away_yards].into_iter().flatten().map(f64::from));
            turnovers.extend(
                [record.home_turnovers, record.away_turnovers]
                    .into_iter()
                    .flatten()
                    .map(f64::from),
            );
            first_downs.extend(
                [record.home_first_downs, record.away_first_downs]
                    .into_iter()
                    .flatten()
                    .map(f64::from),
            );
        }

        ColumnMeans {
            yards: mean_or_zero(&yards),
            turnovers: mean_or_zero(&turnovers),
            first_downs: mean_or_zero(&first_downs),
        }
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(week: u8, home: &str, away: &str, points: Option<(u16, u16)>) -> GameRecord {
        GameRecord {
            season: 2015,
            week,
            date: NaiveDate::from_ymd_opt(2015, 9, 1).unwrap() + chrono::Duration::weeks(week as i64),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_points: points.map(|p| p.0),
            away_points: points.map(|p| p.1),
            home_yards: Some(400),
            away_yards: Some(300),
            home_turnovers: Some(1),
            away_turnovers: Some(3),
            home_first_downs: Some(20),
            away_first_downs: Some(16),
        }
    }

    #[test]
    fn test_drops_and_sorts() {
        let mut stray = game(1, "Buffalo Bills", "New England Patriots", Some((10, 20)));
        stray.season = 2014;

        let batch = SeasonBatch::new(
            2015,
            vec![
                game(2, "Dallas Cowboys", "Philadelphia Eagles", Some((27, 20))),
                game(1, "Chicago Bears", "Green Bay Packers", Some((23, 31))),
                game(1, "Chicago Bears", "Green Bay Packers", Some((23, 31))),
                game(3, "Miami Dolphins", "New York Jets", None),
                game(2, "St. Louis Rams", "Los Angeles Rams", Some((1, 0))),
                stray,
            ],
        );

        let (cleaned, summary) = clean_season_with_summary(&batch);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.games[0].week, 1);
        assert_eq!(cleaned.games[1].week, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.unplayed, 1);
        assert_eq!(summary.self_matches, 1);
        assert_eq!(summary.wrong_season, 1);
        assert_eq!(summary.imputed_values, 0);
    }

    #[test]
    fn test_imputes_missing_stats_with_season_mean() {
        let mut sparse = game(2, "Denver Broncos", "Kansas City Chiefs", Some((24, 17)));
        sparse.home_yards = None;
        sparse.away_turnovers = None;

        let batch = SeasonBatch::new(
            2015,
            vec![game(1, "Chicago Bears", "Detroit Lions", Some((20, 13))), sparse],
        );
        let (cleaned, summary) = clean_season_with_summary(&batch);

        assert_eq!(summary.imputed_values, 2);
        let filled = &cleaned.games[1];
        // mean of 400, 300, 300
        assert!((filled.home_yards - 1000.0 / 3.0).abs() < 1e-9);
        // mean of 1, 3, 1
        assert!((filled.away_turnovers - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_has_fixed_columns() {
        let batch = SeasonBatch::new(
            2015,
            vec![
                game(1, "Chicago Bears", "Detroit Lions", Some((20, 13))),
                game(2, "Detroit Lions", "Chicago Bears", Some((7, 14))),
            ],
        );
        let matrix = clean_season(&batch).to_matrix();
        assert_eq!(matrix.dim(), (2, GAME_COLUMNS.len()));
        assert_eq!(matrix[[0, 1]], 20.0);
        assert_eq!(matrix[[1, 2]], 14.0);
    }

    #[test]
    fn test_empty_season() {
        let cleaned = clean_season(&SeasonBatch::new(2015, vec![]));
        assert!(cleaned.is_empty());
        assert_eq!(cleaned.to_matrix().dim(), (0, GAME_COLUMNS.len()));
    }
}
