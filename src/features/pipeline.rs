//! Weekly feature tables
//!
//! filter -> aggregate -> derive -> smooth, for one grouping key. The passer
//! and defense tables share this path and differ only in `EntityKind`.

use serde_json::Value;

use crate::data::events::PlayEvent;
use crate::data::sources::EventSource;
use crate::features::aggregate::Aggregator;
use crate::features::derive::{derive, Feature, WeeklyFeatures};
use crate::features::ewma::Ewma;
use crate::output::Tabular;
use crate::{EntityKind, FeatureConfig, Result, SeasonRange};

/// One output row: identity, context and smoothed features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub entity: String,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub season: u16,
    pub week: u8,
    pub home_flag: bool,
    pub roof: Option<String>,
    pub surface: Option<String>,
    /// Smoothed values, indexed by `Feature::index`
    pub smoothed: [f64; Feature::COUNT],
}

impl FeatureRow {
    pub fn smoothed(&self, feature: Feature) -> f64 {
        self.smoothed[feature.index()]
    }
}

/// Per-entity-week table of smoothed features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub kind: EntityKind,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct entities in output order
    pub fn entities(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if out.last() != Some(&row.entity.as_str()) {
                out.push(&row.entity);
            }
        }
        out
    }
}

fn opt_text(value: &Option<String>) -> Value {
    value.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))
}

impl Tabular for FeatureTable {
    fn header(&self) -> Vec<String> {
        let mut columns = vec![self.kind.key_column().to_string()];
        if self.kind == EntityKind::Passer {
            columns.push("posteam".to_string());
            columns.push("defteam".to_string());
        }
        for name in ["season", "week", "home_flag", "roof", "surface"] {
            columns.push(name.to_string());
        }
        columns.extend(Feature::ALL.iter().map(Feature::smoothed_column));
        columns
    }

    fn records(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = vec![Value::String(row.entity.clone())];
                if self.kind == EntityKind::Passer {
                    record.push(opt_text(&row.posteam));
                    record.push(opt_text(&row.defteam));
                }
                record.push(Value::from(row.season));
                record.push(Value::from(row.week));
                record.push(Value::Bool(row.home_flag));
                record.push(opt_text(&row.roof));
                record.push(opt_text(&row.surface));
                record.extend(row.smoothed.iter().map(|&v| Value::from(v)));
                record
            })
            .collect()
    }
}

/// Builds a `FeatureTable` for one grouping key
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    aggregator: Aggregator,
    smoother: Ewma,
    play_type: String,
}

impl FeaturePipeline {
    pub fn new(kind: EntityKind, config: &FeatureConfig) -> Result<Self> {
        Ok(FeaturePipeline {
            aggregator: Aggregator::new(kind),
            smoother: Ewma::from_span(config.span)?.with_adjust(config.adjust),
            play_type: config.play_type.clone(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.aggregator.kind()
    }

    /// Derived, unsmoothed weekly rows (ordered by entity, season, week)
    pub fn weekly(&self, events: &[PlayEvent]) -> Vec<WeeklyFeatures> {
        let kind = self.kind();
        let plays = events.iter().filter(|e| e.is_play_type(&self.play_type));
        self.aggregator
            .aggregate(plays)
            .iter()
            .map(|record| derive(record, kind))
            .collect()
    }

    pub fn run(&self, events: &[PlayEvent]) -> FeatureTable {
        let weekly = self.weekly(events);
        let table = self.smooth(weekly);
        log::info!(
            "Built {} table: {} rows, {} entities",
            self.kind(),
            table.len(),
            table.entities().len()
        );
        table
    }

    /// Smooth each feature independently within each entity's run of rows
    fn smooth(&self, weekly: Vec<WeeklyFeatures>) -> FeatureTable {
        let mut rows = Vec::with_capacity(weekly.len());

        for group in weekly.chunk_by(|a, b| a.entity == b.entity) {
            let mut smoothed = vec![[f64::NAN; Feature::COUNT]; group.len()];
            for feature in Feature::ALL {
                let raw: Vec<f64> = group.iter().map(|w| w.value(feature)).collect();
                for (slot, value) in smoothed.iter_mut().zip(self.smoother.smooth(&raw)) {
                    slot[feature.index()] = value;
                }
            }

            for (week, smoothed) in group.iter().zip(smoothed) {
                rows.push(FeatureRow {
                    entity: week.entity.clone(),
                    posteam: week.posteam.clone(),
                    defteam: week.defteam.clone(),
                    season: week.season,
                    week: week.week,
                    home_flag: week.home_flag,
                    roof: week.roof.clone(),
                    surface: week.surface.clone(),
                    smoothed,
                });
            }
        }

        FeatureTable {
            kind: self.kind(),
            rows,
        }
    }
}

/// Passer and defense tables built from one fetch
#[derive(Debug, Clone)]
pub struct WeeklyTables {
    pub passing: FeatureTable,
    pub defense: FeatureTable,
}

/// Load `offset` seasons back from `year` and build both tables
pub fn build_all<S: EventSource>(source: &S, year: u16, config: &FeatureConfig) -> Result<WeeklyTables> {
    let range = SeasonRange::lookback(year, config.offset);
    let events = source.fetch_range(range)?;

    Ok(WeeklyTables {
        passing: FeaturePipeline::new(EntityKind::Passer, config)?.run(&events),
        defense: FeaturePipeline::new(EntityKind::Defense, config)?.run(&events),
    })
}

/// Load `offset` seasons back from `year` and build one table
pub fn build_table<S: EventSource>(
    source: &S,
    kind: EntityKind,
    year: u16,
    config: &FeatureConfig,
) -> Result<FeatureTable> {
    let pipeline = FeaturePipeline::new(kind, config)?;
    let events = source.fetch_range(SeasonRange::lookback(year, config.offset))?;
    Ok(pipeline.run(&events))
}
