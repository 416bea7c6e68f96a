//! Play-level event records
//!
//! One `PlayEvent` per play, decoded from nflverse play-by-play parquet
//! files or CSV exports. The column list is checked before any row is read.

use crate::{EntityKind, GridironError, Result};
use parquet::file::reader::{ChunkReader, FileReader, SerializedFileReader};
use parquet::record::Field;
use parquet::schema::types::Type;
use std::collections::{HashMap, HashSet};
use std::io::Read;

/// Columns a play-by-play table must provide
pub const PLAY_COLUMNS: [&str; 21] = [
    "passer_player_name",
    "posteam",
    "defteam",
    "season",
    "week",
    "home_team",
    "away_team",
    "play_type",
    "air_yards",
    "yards_after_catch",
    "epa",
    "complete_pass",
    "incomplete_pass",
    "interception",
    "qb_hit",
    "sack",
    "pass_touchdown",
    "passing_yards",
    "cpoe",
    "roof",
    "surface",
];

/// A single decoded cell before it is assigned to a typed field
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Missing,
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Interpret a CSV cell; `NA` and empty strings are missing
    pub fn from_text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == "NA" {
            return RawValue::Missing;
        }
        match s.parse::<f64>() {
            Ok(n) => RawValue::Number(n),
            Err(_) => RawValue::Text(s.to_string()),
        }
    }

    pub(crate) fn from_field(field: &Field) -> Self {
        match field {
            Field::Null => RawValue::Missing,
            Field::Bool(b) => RawValue::Number(if *b { 1.0 } else { 0.0 }),
            Field::Byte(v) => RawValue::Number(*v as f64),
            Field::Short(v) => RawValue::Number(*v as f64),
            Field::Int(v) => RawValue::Number(*v as f64),
            Field::Long(v) => RawValue::Number(*v as f64),
            Field::UByte(v) => RawValue::Number(*v as f64),
            Field::UShort(v) => RawValue::Number(*v as f64),
            Field::UInt(v) => RawValue::Number(*v as f64),
            Field::ULong(v) => RawValue::Number(*v as f64),
            Field::Float(v) => RawValue::Number(*v as f64),
            Field::Double(v) => RawValue::Number(*v),
            Field::Str(s) => RawValue::Text(s.clone()),
            _ => RawValue::Missing,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if !n.is_nan() => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) if !s.is_empty() => Some(s.clone()),
            RawValue::Number(n) if !n.is_nan() => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One play
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayEvent {
    pub passer_player_name: Option<String>,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub season: u16,
    pub week: u8,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub play_type: Option<String>,
    pub air_yards: Option<f64>,
    pub yards_after_catch: Option<f64>,
    pub epa: Option<f64>,
    pub complete_pass: Option<f64>,
    pub incomplete_pass: Option<f64>,
    pub interception: Option<f64>,
    pub qb_hit: Option<f64>,
    pub sack: Option<f64>,
    pub pass_touchdown: Option<f64>,
    pub passing_yards: Option<f64>,
    pub cpoe: Option<f64>,
    pub roof: Option<String>,
    pub surface: Option<String>,
}

impl PlayEvent {
    /// Build from values laid out in `PLAY_COLUMNS` order.
    ///
    /// Returns `None` when season or week is missing; such rows cannot be
    /// placed on the timeline.
    pub fn from_row(row: &[RawValue]) -> Option<Self> {
        let season = row.get(3)?.number()?;
        let week = row.get(4)?.number()?;
        if season < 0.0 || week < 0.0 {
            return None;
        }
        let text = |i: usize| row.get(i).and_then(RawValue::text);
        let num = |i: usize| row.get(i).and_then(RawValue::number);

        Some(PlayEvent {
            passer_player_name: text(0),
            posteam: text(1),
            defteam: text(2),
            season: season as u16,
            week: week as u8,
            home_team: text(5),
            away_team: text(6),
            play_type: text(7),
            air_yards: num(8),
            yards_after_catch: num(9),
            epa: num(10),
            complete_pass: num(11),
            incomplete_pass: num(12),
            interception: num(13),
            qb_hit: num(14),
            sack: num(15),
            pass_touchdown: num(16),
            passing_yards: num(17),
            cpoe: num(18),
            roof: text(19),
            surface: text(20),
        })
    }

    /// Identity of the grouping entity for this play
    pub fn entity(&self, kind: EntityKind) -> Option<&str> {
        match kind {
            EntityKind::Passer => self.passer_player_name.as_deref(),
            EntityKind::Defense => self.defteam.as_deref(),
        }
    }

    pub fn is_play_type(&self, play_type: &str) -> bool {
        self.play_type.as_deref() == Some(play_type)
    }
}

/// Fail with `SchemaMismatch` on the first required column not in `available`
pub fn check_columns<'a>(table: &str, available: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let available: HashSet<&str> = available.into_iter().collect();
    for column in PLAY_COLUMNS {
        if !available.contains(column) {
            return Err(GridironError::schema(table, column));
        }
    }
    Ok(())
}

fn column_slots() -> HashMap<&'static str, usize> {
    PLAY_COLUMNS.iter().enumerate().map(|(i, c)| (*c, i)).collect()
}

/// Decode play events from a parquet file or in-memory buffer
pub fn read_parquet<R: ChunkReader + 'static>(input: R, table: &str) -> Result<Vec<PlayEvent>> {
    let reader = SerializedFileReader::new(input)?;
    let schema = reader.metadata().file_metadata().schema_descr();
    check_columns(table, schema.columns().iter().map(|c| c.name()))?;
    let projection = play_projection(schema.root_schema())?;

    let slots = column_slots();
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for row in reader.get_row_iter(Some(projection))? {
        let row = row?;
        let mut values = vec![RawValue::Missing; PLAY_COLUMNS.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(&slot) = slots.get(name.as_str()) {
                values[slot] = RawValue::from_field(field);
            }
        }
        match PlayEvent::from_row(&values) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("{}: skipped {} plays without season/week", table, skipped);
    }
    log::debug!("{}: decoded {} plays", table, events.len());
    Ok(events)
}

/// Narrow a file schema to the `PLAY_COLUMNS` fields, in file order
fn play_projection(root: &Type) -> Result<Type> {
    let fields = root
        .get_fields()
        .iter()
        .filter(|f| PLAY_COLUMNS.contains(&f.name()))
        .cloned()
        .collect();
    Ok(Type::group_type_builder(root.name())
        .with_fields(fields)
        .build()?)
}

/// Decode play events from CSV with a header row
pub fn read_csv<R: Read>(input: R, table: &str) -> Result<Vec<PlayEvent>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();
    check_columns(table, headers.iter())?;

    let header_index: HashMap<&str, usize> =
        headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let positions: Vec<usize> = PLAY_COLUMNS
        .iter()
        .map(|c| header_index[c])
        .collect();

    let mut events = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let values: Vec<RawValue> = positions
            .iter()
            .map(|&i| record.get(i).map(RawValue::from_text).unwrap_or(RawValue::Missing))
            .collect();
        match PlayEvent::from_row(&values) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("{}: skipped {} plays without season/week", table, skipped);
    }
    Ok(events)
}
