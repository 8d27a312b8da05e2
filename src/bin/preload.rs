//! Season store pre-load
//!
//! Splits a flat CSV of games into per-season files under the store.

use clap::Parser;
use gridiron::data::store::{read_games_csv, SeasonStore};
use gridiron::{Config, GridironError, Result};

#[derive(Parser)]
#[command(name = "preload")]
#[command(about = "Load a flat games CSV into the season store", long_about = None)]
struct Cli {
    /// CSV with one game per row
    input: String,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Store directory (overrides config)
    #[arg(long)]
    store: Option<String>,

    /// First season to keep
    #[arg(long, default_value = "2009")]
    start_year: i32,

    /// Last season to keep
    #[arg(long)]
    end_year: Option<i32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Some(end) = cli.end_year {
        if end < cli.start_year {
            return Err(GridironError::Configuration(format!(
                "end year {} is before start year {}",
                end, cli.start_year
            )));
        }
    }

    let store_dir = match &cli.store {
        Some(dir) => dir.clone(),
        None if std::path::Path::new(&cli.config).exists() => {
            Config::load(&cli.config)?.data.store_dir
        }
        None => Config::default().data.store_dir,
    };

    let games = read_games_csv(&cli.input)?;
    let total = games.len();
    let kept: Vec<_> = games
        .into_iter()
        .filter(|g| g.season >= cli.start_year && cli.end_year.map_or(true, |end| g.season <= end))
        .collect();
    log::info!(
        "Keeping {} of {} games from {}",
        kept.len(),
        total,
        cli.input
    );

    let store = SeasonStore::open(&store_dir)?;
    let written = store.import_games(kept)?;

    println!("Season store: {}", store.root().display());
    println!("───────────────────────────────");
    for (year, count) in &written {
        println!("  {}: {} games", year, count);
    }
    println!(
        "  {} seasons, {} games",
        written.len(),
        written.iter().map(|(_, c)| c).sum::<usize>()
    );

    Ok(())
}
