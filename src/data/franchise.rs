//! Franchise name resolution
//!
//! Season files name teams the way they were called that season. Season
//! transitions compare one season's statistics with the next season's
//! games, so every name is mapped to a canonical franchise for its year.

use std::fmt;
use std::ops::RangeInclusive;

/// Canonical franchise identity (the franchise's current name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FranchiseId(pub String);

impl fmt::Display for FranchiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A historical name valid for a span of seasons
struct Alias {
    name: &'static str,
    years: RangeInclusive<i32>,
    franchise: &'static str,
}

const ALIASES: &[Alias] = &[
    Alias {
        name: "San Diego Chargers",
        years: 1961..=2016,
        franchise: "Los Angeles Chargers",
    },
    Alias {
        name: "St. Louis Rams",
        years: 1995..=2015,
        franchise: "Los Angeles Rams",
    },
    Alias {
        name: "Oakland Raiders",
        years: 1960..=2019,
        franchise: "Las Vegas Raiders",
    },
    Alias {
        name: "Los Angeles Raiders",
        years: 1982..=1994,
        franchise: "Las Vegas Raiders",
    },
    Alias {
        name: "Washington Redskins",
        years: 1937..=2019,
        franchise: "Washington Commanders",
    },
    Alias {
        name: "Washington Football Team",
        years: 2020..=2021,
        franchise: "Washington Commanders",
    },
    Alias {
        name: "Houston Oilers",
        years: 1960..=1996,
        franchise: "Tennessee Titans",
    },
    Alias {
        name: "Tennessee Oilers",
        years: 1997..=1998,
        franchise: "Tennessee Titans",
    },
    Alias {
        name: "Baltimore Colts",
        years: 1953..=1983,
        franchise: "Indianapolis Colts",
    },
    Alias {
        name: "St. Louis Cardinals",
        years: 1960..=1987,
        franchise: "Arizona Cardinals",
    },
    Alias {
        name: "Phoenix Cardinals",
        years: 1988..=1993,
        franchise: "Arizona Cardinals",
    },
    // The original Browns moved to Baltimore; the 1999 Browns are a new franchise
    Alias {
        name: "Cleveland Browns",
        years: 1946..=1995,
        franchise: "Baltimore Ravens",
    },
];

/// Resolve a team name as used in a given season
pub fn resolve(name: &str, year: i32) -> FranchiseId {
    let trimmed = name.trim();
    let lower = trimmed.to_lowercase();

    ALIASES
        .iter()
        .find(|alias| alias.name.to_lowercase() == lower && alias.years.contains(&year))
        .map(|alias| FranchiseId(alias.franchise.to_string()))
        .unwrap_or_else(|| FranchiseId(canonical_case(trimmed)))
}

/// Collapse internal whitespace so "New  York Jets" and "New York Jets" agree
fn canonical_case(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocated_franchise() {
        let before = resolve("San Diego Chargers", 2016);
        let after = resolve("Los Angeles Chargers", 2017);
        assert_eq!(before, after);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            resolve("oakland raiders", 2019),
            FranchiseId("Las Vegas Raiders".to_string())
        );
    }

    #[test]
    fn test_year_dependent_alias() {
        assert_eq!(
            resolve("Cleveland Browns", 1995),
            FranchiseId("Baltimore Ravens".to_string())
        );
        assert_eq!(
            resolve("Cleveland Browns", 1999),
            FranchiseId("Cleveland Browns".to_string())
        );
    }

    #[test]
    fn test_unknown_name_is_its_own_franchise() {
        assert_eq!(
            resolve("  New  York Jets ", 2010),
            FranchiseId("New York Jets".to_string())
        );
    }
}
