//! Team statistics computation
//!
//! Per-franchise aggregates over a set of cleaned games.

use std::collections::HashMap;

use crate::data::cleaning::CleanedGame;
use crate::data::franchise::FranchiseId;

/// Accumulated statistics for a franchise
#[derive(Debug, Clone, Default)]
pub struct TeamStatistics {
    /// Total games played
    pub games_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    /// Total points scored
    pub points_for: f64,
    /// Total points conceded
    pub points_against: f64,
    pub yards_for: f64,
    pub yards_against: f64,
    /// Turnovers committed by the team
    pub turnovers_committed: f64,
    /// Turnovers committed by its opponents
    pub turnovers_forced: f64,
    pub home_games: usize,
}

impl TeamStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update statistics with a game the team took part in
    pub fn update(&mut self, game: &CleanedGame, team: &FranchiseId) {
        let is_home = &game.home == team;

        let (score_for, score_against) = if is_home {
            (game.home_points, game.away_points)
        } else {
            (game.away_points, game.home_points)
        };
        let (yards_for, yards_against) = if is_home {
            (game.home_yards, game.away_yards)
        } else {
            (game.away_yards, game.home_yards)
        };
        let (committed, forced) = if is_home {
            (game.home_turnovers, game.away_turnovers)
        } else {
            (game.away_turnovers, game.home_turnovers)
        };

        self.games_played += 1;
        self.points_for += score_for;
        self.points_against += score_against;
        self.yards_for += yards_for;
        self.yards_against += yards_against;
        self.turnovers_committed += committed;
        self.turnovers_forced += forced;
        if is_home {
            self.home_games += 1;
        }

        match score_for.partial_cmp(&score_against) {
            Some(std::cmp::Ordering::Greater) => self.wins += 1,
            Some(std::cmp::Ordering::Less) => self.losses += 1,
            _ => self.ties += 1,
        }
    }

    /// Win ratio with ties counted as half a win (0.5 before any game)
    pub fn win_ratio(&self) -> f64 {
        if self.games_played == 0 {
            0.5
        } else {
            (self.wins as f64 + 0.5 * self.ties as f64) / self.games_played as f64
        }
    }

    fn per_game(&self, total: f64) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            total / self.games_played as f64
        }
    }

    pub fn avg_points_for(&self) -> f64 {
        self.per_game(self.points_for)
    }

    pub fn avg_points_against(&self) -> f64 {
        self.per_game(self.points_against)
    }

    /// Average yardage differential per game
    pub fn avg_yard_margin(&self) -> f64 {
        self.per_game(self.yards_for - self.yards_against)
    }

    /// Average turnover differential per game (positive = more takeaways)
    pub fn avg_turnover_margin(&self) -> f64 {
        self.per_game(self.turnovers_forced - self.turnovers_committed)
    }

    pub fn profile(&self) -> TeamProfile {
        TeamProfile {
            win_rate: self.win_ratio(),
            points_for: self.avg_points_for(),
            points_against: self.avg_points_against(),
            yard_margin: self.avg_yard_margin(),
            turnover_margin: self.avg_turnover_margin(),
        }
    }
}

/// Fixed-width per-game summary of a franchise, used as model features
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamProfile {
    pub win_rate: f64,
    pub points_for: f64,
    pub points_against: f64,
    pub yard_margin: f64,
    pub turnover_margin: f64,
}

impl TeamProfile {
    pub const DIM: usize = 5;
    pub const NAMES: [&'static str; Self::DIM] = [
        "win_rate",
        "points_for",
        "points_against",
        "yard_margin",
        "turnover_margin",
    ];

    pub fn to_array(&self) -> [f64; Self::DIM] {
        [
            self.win_rate,
            self.points_for,
            self.points_against,
            self.yard_margin,
            self.turnover_margin,
        ]
    }
}

/// Statistics for every franchise over a set of games
#[derive(Debug, Clone, Default)]
pub struct SeasonTable {
    stats: HashMap<FranchiseId, TeamStatistics>,
}

impl SeasonTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_games<'a>(games: impl IntoIterator<Item = &'a CleanedGame>) -> Self {
        let mut table = SeasonTable::new();
        for game in games {
            table.add_game(game);
        }
        table
    }

    pub fn add_game(&mut self, game: &CleanedGame) {
        self.stats
            .entry(game.home.clone())
            .or_default()
            .update(game, &game.home);
        self.stats
            .entry(game.away.clone())
            .or_default()
            .update(game, &game.away);
    }

    pub fn get(&self, team: &FranchiseId) -> Option<&TeamStatistics> {
        self.stats.get(team)
    }

    /// Profile of a franchise that has played, or `fallback` otherwise
    pub fn profile_or(&self, team: &FranchiseId, fallback: TeamProfile) -> TeamProfile {
        match self.stats.get(team) {
            Some(stats) if stats.games_played > 0 => stats.profile(),
            _ => fallback,
        }
    }

    /// Mean profile across franchises (a neutral team with no history)
    pub fn league_average(&self) -> TeamProfile {
        if self.stats.is_empty() {
            return TeamStatistics::new().profile();
        }

        let n = self.stats.len() as f64;
        let mut total = [0.0; TeamProfile::DIM];
        for stats in self.stats.values() {
            for (sum, value) in total.iter_mut().zip(stats.profile().to_array()) {
                *sum += value;
            }
        }

        TeamProfile {
            win_rate: total[0] / n,
            points_for: total[1] / n,
            points_against: total[2] / n,
            yard_margin: total[3] / n,
            turnover_margin: total[4] / n,
        }
    }

    pub fn team_count(&self) -> usize {
        self.stats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_game(home: &str, away: &str, home_points: f64, away_points: f64) -> CleanedGame {
        CleanedGame {
            week: 1,
            date: NaiveDate::from_ymd_opt(2018, 9, 9).unwrap(),
            home: FranchiseId(home.to_string()),
            away: FranchiseId(away.to_string()),
            home_points,
            away_points,
            home_yards: 380.0,
            away_yards: 300.0,
            home_turnovers: 1.0,
            away_turnovers: 2.0,
            home_first_downs: 21.0,
            away_first_downs: 17.0,
        }
    }

    #[test]
    fn test_team_statistics() {
        let bears = FranchiseId("Bears".to_string());
        let mut stats = TeamStatistics::new();

        // Home win
        stats.update(&make_game("Bears", "Lions", 30.0, 20.0), &bears);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.home_games, 1);
        assert_eq!(stats.points_for, 30.0);
        assert_eq!(stats.turnovers_forced, 2.0);

        // Away loss
        stats.update(&make_game("Lions", "Bears", 25.0, 15.0), &bears);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.yards_for, 680.0);
        assert_eq!(stats.win_ratio(), 0.5);
        assert_eq!(stats.avg_points_against(), 22.5);
    }

    #[test]
    fn test_ties_count_half() {
        let team = FranchiseId("Bears".to_string());
        let mut stats = TeamStatistics::new();
        stats.update(&make_game("Bears", "Lions", 20.0, 20.0), &team);
        stats.update(&make_game("Bears", "Lions", 21.0, 20.0), &team);
        assert_eq!(stats.ties, 1);
        assert_eq!(stats.win_ratio(), 0.75);
    }

    #[test]
    fn test_season_table_profiles() {
        let games = vec![
            make_game("Bears", "Lions", 30.0, 20.0),
            make_game("Packers", "Bears", 14.0, 24.0),
        ];
        let table = SeasonTable::from_games(&games);
        assert_eq!(table.team_count(), 3);

        let bears = table.profile_or(&FranchiseId("Bears".to_string()), TeamProfile::default());
        assert_eq!(bears.win_rate, 1.0);
        assert_eq!(bears.points_for, 27.0);

        let fallback = TeamProfile {
            win_rate: 0.25,
            ..TeamProfile::default()
        };
        let unknown = table.profile_or(&FranchiseId("Texans".to_string()), fallback);
        assert_eq!(unknown, fallback);

        // Bears 1.0, Lions 0.0, Packers 0.0
        let league = table.league_average();
        assert!((league.win_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_league_average() {
        let table = SeasonTable::new();
        let profile = table.league_average();
        assert_eq!(profile.win_rate, 0.5);
        assert_eq!(profile.points_for, 0.0);
    }
}
