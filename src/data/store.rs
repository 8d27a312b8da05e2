//! File-based season store
//!
//! One CSV file per season, keyed by year. The pre-load utility writes the
//! store; the training pipelines only read it.

use crate::{GameRecord, GridironError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Raw game records for one season, as read from storage
#[derive(Debug, Clone)]
pub struct SeasonBatch {
    pub year: i32,
    pub games: Vec<GameRecord>,
}

impl SeasonBatch {
    pub fn new(year: i32, games: Vec<GameRecord>) -> Self {
        SeasonBatch { year, games }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

/// Store summary
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub season_count: usize,
    pub game_count: usize,
    pub first_season: Option<i32>,
    pub last_season: Option<i32>,
}

/// Directory of season files
pub struct SeasonStore {
    root: PathBuf,
}

impl SeasonStore {
    /// Open or create a store at the given directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(SeasonStore {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn season_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("season_{}.csv", year))
    }

    // ==================== Reads ====================

    /// Read one season's raw records
    pub fn read_season(&self, year: i32) -> Result<SeasonBatch> {
        let path = self.season_path(year);
        if !path.exists() {
            return Err(GridironError::SeasonNotFound(year));
        }

        let games = read_games_csv(&path)?;
        log::debug!("Read {} games for season {}", games.len(), year);
        Ok(SeasonBatch::new(year, games))
    }

    /// Read every season in `start..=end`, in year order
    pub fn read_range(&self, start: i32, end: i32) -> Result<Vec<SeasonBatch>> {
        (start..=end).map(|year| self.read_season(year)).collect()
    }

    /// Years with a season file, ascending
    pub fn seasons(&self) -> Result<Vec<i32>> {
        let mut years = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(year) = name
                .strip_prefix("season_")
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|year| year.parse::<i32>().ok())
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let seasons = self.seasons()?;
        let mut game_count = 0;
        for &year in &seasons {
            game_count += self.read_season(year)?.len();
        }

        Ok(StoreStats {
            season_count: seasons.len(),
            game_count,
            first_season: seasons.first().copied(),
            last_season: seasons.last().copied(),
        })
    }

    // ==================== Writes ====================

    /// Write (replace) one season file
    pub fn write_season(&self, batch: &SeasonBatch) -> Result<usize> {
        if let Some(stray) = batch.games.iter().find(|g| g.season != batch.year) {
            return Err(GridironError::DataShape(format!(
                "game dated {} belongs to season {}, not {}",
                stray.date, stray.season, batch.year
            )));
        }

        let mut writer = csv::Writer::from_path(self.season_path(batch.year))?;
        for game in &batch.games {
            writer.serialize(game)?;
        }
        writer.flush()?;

        Ok(batch.games.len())
    }

    /// Split a flat record list by season and write each season
    pub fn import_games(&self, records: Vec<GameRecord>) -> Result<Vec<(i32, usize)>> {
        let mut by_season: BTreeMap<i32, Vec<GameRecord>> = BTreeMap::new();
        for record in records {
            by_season.entry(record.season).or_default().push(record);
        }

        let mut written = Vec::with_capacity(by_season.len());
        for (year, games) in by_season {
            let count = self.write_season(&SeasonBatch::new(year, games))?;
            log::info!("Stored {} games for season {}", count, year);
            written.push((year, count));
        }
        Ok(written)
    }
}

/// Read a CSV file of game records (season files and flat exports alike)
pub fn read_games_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let games = reader
        .deserialize()
        .collect::<std::result::Result<Vec<GameRecord>, _>>()?;
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn game(season: i32, home: &str, away: &str, points: Option<(u16, u16)>) -> GameRecord {
        GameRecord {
            season,
            week: 1,
            date: NaiveDate::from_ymd_opt(season, 9, 10).unwrap(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_points: points.map(|p| p.0),
            away_points: points.map(|p| p.1),
            home_yards: Some(350),
            away_yards: None,
            home_turnovers: Some(1),
            away_turnovers: Some(2),
            home_first_downs: None,
            away_first_downs: Some(18),
        }
    }

    #[test]
    fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeasonStore::open(dir.path()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.season_count, 0);
        assert_eq!(stats.game_count, 0);
        assert!(stats.first_season.is_none());
    }

    #[test]
    fn test_missing_season() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeasonStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read_season(2010),
            Err(GridironError::SeasonNotFound(2010))
        ));
    }

    #[test]
    fn test_import_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeasonStore::open(dir.path().join("seasons")).unwrap();

        let records = vec![
            game(2011, "Chicago Bears", "Detroit Lions", Some((20, 17))),
            game(2010, "New York Jets", "Miami Dolphins", Some((9, 31))),
            game(2011, "Denver Broncos", "Oakland Raiders", None),
        ];
        let written = store.import_games(records).unwrap();
        assert_eq!(written, vec![(2010, 1), (2011, 2)]);
        assert_eq!(store.seasons().unwrap(), vec![2010, 2011]);

        let season = store.read_season(2011).unwrap();
        assert_eq!(season.year, 2011);
        assert_eq!(season.len(), 2);
        assert_eq!(season.games[0].home_points, Some(20));
        assert_eq!(season.games[0].away_yards, None);
        assert_eq!(season.games[1].home_points, None);

        let range = store.read_range(2010, 2011).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].year, 2010);

        let stats = store.stats().unwrap();
        assert_eq!(stats.game_count, 3);
        assert_eq!(stats.last_season, Some(2011));
    }

    #[test]
    fn test_write_rejects_other_season() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeasonStore::open(dir.path()).unwrap();
        let batch = SeasonBatch::new(2012, vec![game(2013, "A", "B", Some((1, 0)))]);
        assert!(matches!(
            store.write_season(&batch),
            Err(GridironError::DataShape(_))
        ));
    }
}
