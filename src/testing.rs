//! Synthetic data shared by unit tests

use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::store::SeasonBatch;
use crate::GameRecord;

const TEAMS: [&str; 8] = [
    "Chicago Bears",
    "Detroit Lions",
    "Green Bay Packers",
    "Minnesota Vikings",
    "San Diego Chargers",
    "Denver Broncos",
    "Kansas City Chiefs",
    "Oakland Raiders",
];

/// Team name as it was written in `year`
fn team_name(index: usize, year: i32) -> String {
    match TEAMS[index] {
        "San Diego Chargers" if year >= 2017 => "Los Angeles Chargers".to_string(),
        name => name.to_string(),
    }
}

/// A full round-robin season with a fixed strength per team, so that
/// previous-season form carries signal about next-season outcomes
pub fn synthetic_season(year: i32, seed: u64) -> SeasonBatch {
    let mut rng = StdRng::seed_from_u64(seed ^ year as u64);
    let n = TEAMS.len();
    let strength: Vec<f64> = (0..n).map(|i| (i as f64 - 3.5) * 2.5).collect();
    let opening = NaiveDate::from_ymd_opt(year, 9, 7).unwrap_or_default();

    // Circle method: team 0 stays, the others rotate
    let mut order: Vec<usize> = (0..n).collect();
    let mut games = Vec::new();
    for week in 1..n as u8 {
        for slot in 0..n / 2 {
            let (a, b) = (order[slot], order[n - 1 - slot]);
            let (home, away) = if (week as usize + slot) % 2 == 0 { (a, b) } else { (b, a) };
            let margin = strength[home] - strength[away] + 2.5 + rng.gen_range(-10.0..10.0);
            let base = rng.gen_range(14.0..24.0);
            let home_points = (base + margin.max(0.0)).round() as u16;
            let away_points = (base - margin.min(0.0)).round() as u16;

            games.push(GameRecord {
                season: year,
                week,
                date: opening + chrono::Duration::weeks(week as i64 - 1),
                home_team: team_name(home, year),
                away_team: team_name(away, year),
                home_points: Some(home_points),
                away_points: Some(away_points),
                home_yards: Some((300.0 + strength[home] * 8.0 + rng.gen_range(-40.0..40.0)) as u16),
                away_yards: Some((300.0 + strength[away] * 8.0 + rng.gen_range(-40.0..40.0)) as u16),
                home_turnovers: Some(rng.gen_range(0..4)),
                away_turnovers: Some(rng.gen_range(0..4)),
                home_first_downs: Some(rng.gen_range(14..26)),
                away_first_downs: if week % 3 == 0 { None } else { Some(rng.gen_range(14..26)) },
            });
        }
        order[1..].rotate_right(1);
    }

    SeasonBatch::new(year, games)
}

/// Two roughly balanced classes separated by a plane in the first two
/// features, with a band of label noise around the boundary
pub fn synthetic_classification(rows: usize, features: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Array2<f64> = Array2::from_shape_fn((rows, features), |_| rng.gen_range(-1.0..1.0));
    let y = x
        .rows()
        .into_iter()
        .map(|row| {
            let score = row[0] + 0.5 * row[1];
            if score.abs() < 0.05 {
                usize::from(rng.gen_bool(0.5))
            } else {
                usize::from(score > 0.0)
            }
        })
        .collect::<Array1<usize>>();
    (x, y)
}
