//! Gridiron CLI
//!
//! Season-over-season football outcome prediction with classical
//! classifiers and a stacking ensemble.

use clap::{Args, Parser, Subcommand};
use gridiron::model::ModelKind;
use gridiron::{Config, Result};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "Football game outcome prediction from previous-season form", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Season store commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Fit one classifier with its configured hyperparameters
    Train {
        /// svm, logistic, nn or forest
        model: ModelKind,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Grid-search one classifier with cross-validation
    Tune {
        /// svm, logistic, nn or forest
        model: ModelKind,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Compare the sweep scalers, power transform included: baseline and grid search per round
    Sweep {
        /// Classifier to sweep
        #[arg(long, default_value = "svm")]
        model: ModelKind,
        /// Shuffled splits per scaler
        #[arg(long, default_value = "1")]
        rounds: usize,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Tune all four classifiers and stack them
    Ensemble {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show season store status
    Status,
    /// Import a CSV of games into per-season files
    Import {
        /// CSV with one game per row
        input: String,
    },
    /// Write the built feature/label set to CSV
    Export {
        /// Output path
        output: String,
    },
}

/// Overrides shared by the model commands
#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// First season
    #[arg(long)]
    start_year: Option<i32>,
    /// Last season (inclusive)
    #[arg(long)]
    end_year: Option<i32>,
    /// quantile, gaussian, robust, minmax or standard
    #[arg(long)]
    scaler: Option<String>,
    /// Held-out fraction
    #[arg(long)]
    test_size: Option<f64>,
    /// Print the confusion matrix heatmap
    #[arg(long)]
    display: bool,
}

impl RunArgs {
    fn apply(&self, config: &Config) -> Result<Config> {
        let mut config = config.clone();
        if let Some(start) = self.start_year {
            config.seasons.start_year = start;
        }
        if let Some(end) = self.end_year {
            config.seasons.end_year = end;
        }
        if let Some(scaler) = &self.scaler {
            config.preprocessing.scaler = scaler.clone();
        }
        if let Some(test_size) = self.test_size {
            config.split.test_fraction = test_size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Status => commands::data_status(&config),
            DataCommands::Import { input } => commands::data_import(&config, &input),
            DataCommands::Export { output } => commands::data_export(&config, &output),
        },
        Commands::Train { model, run } => commands::train(&config, model, &run),
        Commands::Tune { model, run } => commands::tune(&config, model, &run),
        Commands::Sweep { model, rounds, run } => commands::sweep(&config, model, rounds, &run),
        Commands::Ensemble { run } => commands::ensemble(&config, &run),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::store::{read_games_csv, SeasonStore};
    use gridiron::features::ScalerKind;
    use gridiron::training::metrics::Evaluation;
    use gridiron::training::{pipeline, render_heatmap, ReportLog, SearchSummary};
    use gridiron::Outcome;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        SeasonStore::open(&config.data.store_dir)?;
        if let Some(parent) = std::path::Path::new(&config.data.report_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        println!("Created {} and report directories", config.data.store_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'preload <games.csv>' or 'gridiron data import <games.csv>' to fill the store");
        println!("  3. Run 'gridiron train svm' to fit a classifier");
        println!("  4. Run 'gridiron ensemble' to tune and stack all classifiers");

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let store = SeasonStore::open(&config.data.store_dir)?;
        let stats = store.stats()?;

        println!("Season Store Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", store.root().display());
        println!("  Seasons:  {}", stats.season_count);
        println!("  Games:    {}", stats.game_count);
        if let (Some(first), Some(last)) = (stats.first_season, stats.last_season) {
            println!("  Range:    {} to {}", first, last);
        }
        println!(
            "  Config:   {} to {} ({} transitions)",
            config.seasons.start_year,
            config.seasons.end_year,
            config.seasons.transitions()
        );

        Ok(())
    }

    pub fn data_import(config: &Config, input: &str) -> Result<()> {
        let store = SeasonStore::open(&config.data.store_dir)?;
        let games = read_games_csv(input)?;
        println!("Read {} games from {}", games.len(), input);

        for (year, count) in store.import_games(games)? {
            println!("  {}: {} games", year, count);
        }
        Ok(())
    }

    pub fn data_export(config: &Config, output: &str) -> Result<()> {
        let data = pipeline::load_training_set(config)?;
        data.write_csv(output)?;
        let counts = data.class_counts(Outcome::COUNT);
        println!(
            "Wrote {} rows x {} features to {} ({} away wins, {} home wins)",
            data.len(),
            data.n_features(),
            output,
            counts[Outcome::AwayWin.class_index()],
            counts[Outcome::HomeWin.class_index()]
        );
        Ok(())
    }

    pub fn train(config: &Config, model: ModelKind, run: &RunArgs) -> Result<()> {
        let config = run.apply(config)?;
        let scaler: ScalerKind = config.preprocessing.scaler.parse()?;
        let data = pipeline::load_training_set(&config)?;

        let trained = pipeline::train(&config, &data, model, scaler)?;
        let heading = format!("{} | {} | {}", trained.trained.spec, scaler, split_label(&config, false));
        finish(&config, &heading, &trained.evaluation, None, run.display)
    }

    pub fn tune(config: &Config, model: ModelKind, run: &RunArgs) -> Result<()> {
        let config = run.apply(config)?;
        let scaler: ScalerKind = config.preprocessing.scaler.parse()?;
        let data = pipeline::load_training_set(&config)?;

        let trained = pipeline::tune(&config, &data, model, scaler)?;
        let heading = format!("{} grid | {} | {}", model, scaler, split_label(&config, true));
        finish(
            &config,
            &heading,
            &trained.evaluation,
            trained.trained.search.as_ref(),
            run.display,
        )
    }

    pub fn sweep(config: &Config, model: ModelKind, rounds: usize, run: &RunArgs) -> Result<()> {
        let config = run.apply(config)?;
        let data = pipeline::load_training_set(&config)?;
        let report = ReportLog::new(&config.data.report_path);

        let outcomes = pipeline::sweep(&config, &data, model, rounds.max(1), &report)?;

        println!("\n{:<10} {:>5} {:>10} {:>10} {:>10}", "Scaler", "Round", "Baseline", "Tuned", "CV");
        println!("{}", "─".repeat(49));
        for outcome in &outcomes {
            println!(
                "{:<10} {:>5} {:>9.2}% {:>9.2}% {:>9.2}%",
                outcome.scaler.tag(),
                outcome.round + 1,
                outcome.baseline_accuracy * 100.0,
                outcome.tuned_accuracy * 100.0,
                outcome.search.best_score * 100.0
            );
        }
        println!("\nAppended to {}", report.path().display());
        Ok(())
    }

    pub fn ensemble(config: &Config, run: &RunArgs) -> Result<()> {
        let config = run.apply(config)?;
        let scaler: ScalerKind = config.preprocessing.scaler.parse()?;
        let data = pipeline::load_training_set(&config)?;

        let outcome = pipeline::ensemble(&config, &data, scaler)?;

        println!("\nBase estimators:");
        for (name, summary) in &outcome.base {
            println!(
                "  {:<8} {} (CV {:.2}%)",
                name,
                summary.best_spec,
                summary.best_score * 100.0
            );
        }

        let heading = format!("Stacking ensemble | {} | {}", scaler, split_label(&config, true));
        finish(&config, &heading, &outcome.evaluation, None, run.display)
    }

    fn split_label(config: &Config, search: bool) -> String {
        let strategy = if search {
            config.split.search_mode
        } else {
            config.split.fixed_mode
        };
        format!(
            "{} | test {:.0}%",
            strategy.with_seed(config.split.seed),
            config.split.test_fraction * 100.0
        )
    }

    /// Print the evaluation and append it to the report log
    fn finish(
        config: &Config,
        heading: &str,
        evaluation: &Evaluation,
        search: Option<&SearchSummary>,
        display: bool,
    ) -> Result<()> {
        println!("\n{}", heading);
        if let Some(search) = search {
            println!("Best params: {}", search.best_spec);
            println!("Best CV accuracy: {:.2}%", search.best_score * 100.0);
        }
        println!("Accuracy: {:.2}%\n", evaluation.accuracy * 100.0);
        println!("{}", evaluation);

        if display {
            let labels = [Outcome::AwayWin.to_string(), Outcome::HomeWin.to_string()];
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            println!("{}", render_heatmap(&evaluation.confusion, &labels));
        }

        let report = ReportLog::new(&config.data.report_path);
        report.append(heading, evaluation, search)?;
        println!("Appended to {}", report.path().display());
        Ok(())
    }
}
