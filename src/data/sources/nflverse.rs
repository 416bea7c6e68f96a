//! nflverse release readers
//!
//! Play-by-play and Next Gen Stats are published as parquet files on the
//! nflverse-data GitHub releases. Local parquet or CSV copies can stand in
//! for the play-by-play download.

use parquet::file::reader::{ChunkReader, FileReader, SerializedFileReader};
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{fetch, http_client, EventSource};
use crate::data::events::{read_csv, read_parquet, PlayEvent, RawValue};
use crate::data::season_table::{SeasonTable, StatCell};
use crate::{DataSource, GridironError, Result, SeasonRange, SourceConfig};

fn empty_payload(data_source: DataSource, url: &str) -> GridironError {
    GridironError::SourceUnavailable {
        data_source,
        message: format!("{} returned an empty body", url),
    }
}

/// Remote play-by-play, one parquet file per season
pub struct PlayByPlay {
    client: Client,
    url_template: String,
}

impl PlayByPlay {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(PlayByPlay {
            client: http_client(config)?,
            url_template: config.pbp_url.clone(),
        })
    }

    pub fn season_url(&self, season: u16) -> String {
        self.url_template.replace("{season}", &season.to_string())
    }
}

impl EventSource for PlayByPlay {
    fn source(&self) -> DataSource {
        DataSource::PlayByPlay
    }

    fn fetch_season(&self, season: u16) -> Result<Vec<PlayEvent>> {
        let url = self.season_url(season);
        let body = fetch(&self.client, &url, self.source())?.bytes()?;
        if body.is_empty() {
            return Err(empty_payload(self.source(), &url));
        }
        read_parquet(body, &format!("play_by_play_{}", season))
    }
}

/// Play-by-play from a local `.parquet` or `.csv` file covering any seasons
pub struct LocalEvents {
    path: PathBuf,
}

impl LocalEvents {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        LocalEvents {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<Vec<PlayEvent>> {
        let file = File::open(&self.path).map_err(|e| GridironError::SourceUnavailable {
            data_source: DataSource::LocalFile,
            message: format!("{}: {}", self.path.display(), e),
        })?;
        let table = self.path.display().to_string();
        let is_parquet = self
            .path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        log::info!("Reading plays from {}", table);
        if is_parquet {
            read_parquet(file, &table)
        } else {
            read_csv(file, &table)
        }
    }
}

impl EventSource for LocalEvents {
    fn source(&self) -> DataSource {
        DataSource::LocalFile
    }

    fn fetch_season(&self, season: u16) -> Result<Vec<PlayEvent>> {
        self.fetch_range(SeasonRange {
            start: season,
            end: season,
        })
    }

    /// Read the file once and keep the plays inside `range`
    fn fetch_range(&self, range: SeasonRange) -> Result<Vec<PlayEvent>> {
        let mut events = self.load()?;
        events.retain(|e| range.contains(e.season));
        log::debug!("{} plays in seasons {}", events.len(), range);
        Ok(events)
    }
}

/// Next Gen Stats table families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NgsStatType {
    Passing,
    Rushing,
    Receiving,
}

impl NgsStatType {
    pub fn slug(&self) -> &'static str {
        match self {
            NgsStatType::Passing => "passing",
            NgsStatType::Rushing => "rushing",
            NgsStatType::Receiving => "receiving",
        }
    }
}

impl fmt::Display for NgsStatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for NgsStatType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passing" => Ok(NgsStatType::Passing),
            "rushing" => Ok(NgsStatType::Rushing),
            "receiving" => Ok(NgsStatType::Receiving),
            _ => Err(format!(
                "Unknown stat type: {}. Use passing, rushing, or receiving.",
                s
            )),
        }
    }
}

pub struct NextGenStats {
    client: Client,
    url_template: String,
}

impl NextGenStats {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(NextGenStats {
            client: http_client(config)?,
            url_template: config.ngs_url.clone(),
        })
    }

    pub fn stat_url(&self, stat: NgsStatType) -> String {
        self.url_template.replace("{stat}", stat.slug())
    }

    /// Season-level rows (week 0) for seasons in `range`, sorted by player
    pub fn season_summaries(&self, stat: NgsStatType, range: SeasonRange) -> Result<SeasonTable> {
        let url = self.stat_url(stat);
        let body = fetch(&self.client, &url, DataSource::NextGenStats)?.bytes()?;
        if body.is_empty() {
            return Err(empty_payload(DataSource::NextGenStats, &url));
        }
        let table = read_table_parquet(body, &format!("ngs_{}", stat))?;
        log::info!("Loaded {} Next Gen Stats rows for {}", table.len(), stat);
        season_summaries_from(table, range)
    }
}

/// Keep season totals (week 0) within `range`, ordered by display name
pub fn season_summaries_from(mut table: SeasonTable, range: SeasonRange) -> Result<SeasonTable> {
    let season = table.column_index("season")?;
    let week = table.column_index("week")?;
    table.column_index("player_display_name")?;

    table.retain_rows(|row| {
        let in_range = row[season]
            .as_number()
            .map(|s| s >= 0.0 && range.contains(s as u16))
            .unwrap_or(false);
        in_range && row[week].as_number() == Some(0.0)
    });
    table.sort_by_text("player_display_name")?;
    Ok(table)
}

/// Decode a flat parquet file into a `SeasonTable` with the file's own columns
pub fn read_table_parquet<R: ChunkReader + 'static>(input: R, name: &str) -> Result<SeasonTable> {
    let reader = SerializedFileReader::new(input)?;
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let slots: HashMap<String, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), i))
        .collect();

    let mut table = SeasonTable::new(name, columns);
    // every column is kept, so no projection
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut cells = vec![StatCell::Missing; table.columns.len()];
        for (column, field) in row.get_column_iter() {
            if let Some(&slot) = slots.get(column) {
                cells[slot] = StatCell::from(RawValue::from_field(field));
            }
        }
        table.rows.push(cells);
    }
    Ok(table)
}
