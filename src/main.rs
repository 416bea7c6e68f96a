//! Gridiron CLI
//!
//! Builds smoothed weekly NFL feature tables from play-by-play data and
//! scrapes merged season stat tables.

use chrono::Datelike;
use clap::{Parser, Subcommand};
use gridiron::output::OutputFormat;
use gridiron::{Config, EntityKind, Result};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "NFL weekly form features and season stat tables", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "gridiron.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a smoothed weekly feature table from play-by-play events
    Features {
        /// Table to build (passing or defense)
        entity: EntityKind,
        /// Last season to load
        #[arg(long)]
        year: Option<u16>,
        /// Seasons of history to load before the target year
        #[arg(long)]
        offset: Option<u16>,
        /// EWMA span
        #[arg(long)]
        span: Option<f64>,
        /// Use bias-adjusted EWMA weights
        #[arg(long)]
        adjust: bool,
        /// Read plays from a local parquet or CSV file instead of nflverse
        #[arg(long)]
        events: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Scrape and merge the season stat tables for one year
    Season {
        /// Season year
        #[arg(long)]
        year: Option<u16>,
        /// Parse saved `<category>.htm` pages from this directory
        #[arg(long)]
        from_dir: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Next Gen Stats season summaries
    Ngs {
        /// Stat family (passing, rushing, receiving)
        stat: gridiron::data::sources::NgsStatType,
        /// First season
        #[arg(long)]
        start: u16,
        /// Last season
        #[arg(long)]
        end: Option<u16>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write a default config file
    Init,
}

/// Most recent season that has started; seasons kick off in September
fn current_season() -> u16 {
    let today = chrono::Local::now().date_naive();
    let year = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    year as u16
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

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

    let result = match cli.command {
        Commands::Features {
            entity,
            year,
            offset,
            span,
            adjust,
            events,
            format,
            output,
        } => {
            let mut features = config.features.clone();
            if let Some(offset) = offset {
                features.offset = offset;
            }
            if let Some(span) = span {
                features.span = span;
            }
            features.adjust |= adjust;
            let year = year.unwrap_or_else(current_season);
            commands::features(&config, &features, entity, year, events, format, output)
        }
        Commands::Season {
            year,
            from_dir,
            format,
            output,
        } => commands::season(
            &config,
            year.unwrap_or_else(current_season),
            from_dir,
            format,
            output,
        ),
        Commands::Ngs {
            stat,
            start,
            end,
            format,
            output,
        } => commands::ngs(&config, stat, start, end.unwrap_or_else(current_season), format, output),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::sources::{
        season_stats, LocalEvents, NextGenStats, NgsStatType, PlayByPlay,
        ProFootballReference, SavedPages,
    };
    use gridiron::data::TableMerger;
    use gridiron::features::build_table;
    use gridiron::output::{render, Tabular};
    use gridiron::{FeatureConfig, GridironError, SeasonRange};
    use std::io::{BufWriter, Write};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'gridiron features passing --year <YEAR>' to build features");
        println!("  3. Run 'gridiron season --year <YEAR>' to scrape season stats");
        Ok(())
    }

    fn emit<T: Tabular>(table: &T, format: OutputFormat, output: Option<String>) -> Result<()> {
        match output {
            Some(path) => {
                let file = std::fs::File::create(&path)?;
                render(table, format, BufWriter::new(file))?;
                log::info!("Wrote {}", path);
            }
            None => {
                let stdout = std::io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                render(table, format, &mut out)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    pub fn features(
        config: &Config,
        features: &FeatureConfig,
        entity: EntityKind,
        year: u16,
        events: Option<String>,
        format: OutputFormat,
        output: Option<String>,
    ) -> Result<()> {
        log::info!(
            "Building {} features for {} (span {}, {} seasons of history)",
            entity,
            year,
            features.span,
            features.offset
        );

        let table = match events {
            Some(path) => build_table(&LocalEvents::new(path), entity, year, features)?,
            None => build_table(&PlayByPlay::new(&config.sources)?, entity, year, features)?,
        };

        log::info!(
            "{} rows across {} {} entities",
            table.len(),
            table.entities().len(),
            entity
        );
        emit(&table, format, output)
    }

    pub fn season(
        config: &Config,
        year: u16,
        from_dir: Option<String>,
        format: OutputFormat,
        output: Option<String>,
    ) -> Result<()> {
        let merger = TableMerger::new(&config.merge);
        let table = match from_dir {
            Some(dir) => season_stats(&SavedPages::new(dir), year, &merger)?,
            None => season_stats(&ProFootballReference::new(&config.sources)?, year, &merger)?,
        };
        emit(&table, format, output)
    }

    pub fn ngs(
        config: &Config,
        stat: NgsStatType,
        start: u16,
        end: u16,
        format: OutputFormat,
        output: Option<String>,
    ) -> Result<()> {
        if start > end {
            return Err(GridironError::Config(format!(
                "start season {} is after end season {}",
                start, end
            )));
        }
        let source = NextGenStats::new(&config.sources)?;
        let table = source.season_summaries(stat, SeasonRange { start, end })?;
        log::info!("{} season summaries for {}-{}", table.len(), start, end);
        emit(&table, format, output)
    }
}
