//! NFL form features
//!
//! Aggregates play-by-play events into per-entity weekly rows, smooths them
//! with an exponentially weighted moving average, and scrapes/merges
//! season-level stat tables.

pub mod data;
pub mod features;
pub mod output;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Source of raw data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// nflverse play-by-play releases
    PlayByPlay,
    /// nflverse Next Gen Stats releases
    NextGenStats,
    /// pro-football-reference.com season tables
    ProFootballReference,
    /// A file on local disk
    LocalFile,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::PlayByPlay => write!(f, "nflverse play-by-play"),
            DataSource::NextGenStats => write!(f, "nflverse Next Gen Stats"),
            DataSource::ProFootballReference => write!(f, "Pro Football Reference"),
            DataSource::LocalFile => write!(f, "local file"),
        }
    }
}

/// The grouping subject of weekly aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// One row per passer per week
    Passer,
    /// One row per defensive team per week
    Defense,
}

impl EntityKind {
    /// Name of the column identifying the entity
    pub fn key_column(&self) -> &'static str {
        match self {
            EntityKind::Passer => "passer_player_name",
            EntityKind::Defense => "defteam",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Passer => "passing",
            EntityKind::Defense => "defense",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passing" | "passer" | "pass" => Ok(EntityKind::Passer),
            "defense" | "defence" | "def" => Ok(EntityKind::Defense),
            _ => Err(format!("Unknown entity: {}. Use passing or defense.", s)),
        }
    }
}

/// Inclusive range of seasons to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonRange {
    pub start: u16,
    pub end: u16,
}

impl SeasonRange {
    /// `offset` seasons back from `year`, inclusive of both ends
    pub fn lookback(year: u16, offset: u16) -> Self {
        SeasonRange {
            start: year.saturating_sub(offset),
            end: year,
        }
    }

    pub fn contains(&self, season: u16) -> bool {
        (self.start..=self.end).contains(&season)
    }

    pub fn seasons(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl fmt::Display for SeasonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("{data_source} unavailable: {message}")]
    SourceUnavailable {
        data_source: DataSource,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Schema mismatch in {table}: missing column `{column}`")]
    SchemaMismatch { table: String, column: String },

    #[error("Division undefined: {0}")]
    DivisionUndefined(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GridironError {
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        GridironError::SchemaMismatch {
            table: table.into(),
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from gridiron.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub sources: SourceConfig,
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// EWMA span; alpha = 2 / (span + 1)
    pub span: f64,
    /// Seasons of history loaded before the target year
    pub offset: u16,
    /// Use the bias-adjusted weighting instead of the recursive form
    pub adjust: bool,
    /// Play category kept before aggregation
    pub play_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Play-by-play URL, `{season}` is substituted
    pub pbp_url: String,
    /// Next Gen Stats URL, `{stat}` is substituted
    pub ngs_url: String,
    /// Season table URL, `{year}` and `{category}` are substituted
    pub season_table_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Column the season tables are joined on
    pub key: String,
    /// Columns at or after this index are coerced to numbers
    pub numeric_from: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            span: 10.0,
            offset: 20,
            adjust: false,
            play_type: "pass".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            pbp_url: "https://github.com/nflverse/nflverse-data/releases/download/pbp/play_by_play_{season}.parquet"
                .to_string(),
            ngs_url: "https://github.com/nflverse/nflverse-data/releases/download/nextgen_stats/ngs_{stat}.parquet"
                .to_string(),
            season_table_url: "https://www.pro-football-reference.com/years/{year}/{category}.htm"
                .to_string(),
            user_agent: "gridiron/0.1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            key: "Player".to_string(),
            numeric_from: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            features: FeatureConfig::default(),
            sources: SourceConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
