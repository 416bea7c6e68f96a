//! Derived weekly features
//!
//! Turns reduced counting metrics into the raw feature vector that gets
//! smoothed. Source counts consumed by a derivation do not survive.

use crate::features::aggregate::{EntityWeek, Metric};
use crate::{EntityKind, GridironError, Result};

/// Raw features fed to the smoother, in output column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    CompletionPercentage,
    PassAttempts,
    AirYards,
    YardsAfterCatch,
    Epa,
    Interception,
    QbHit,
    Sack,
    PassTouchdown,
    PassingYards,
    Cpoe,
}

impl Feature {
    pub const COUNT: usize = 11;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::CompletionPercentage,
        Feature::PassAttempts,
        Feature::AirYards,
        Feature::YardsAfterCatch,
        Feature::Epa,
        Feature::Interception,
        Feature::QbHit,
        Feature::Sack,
        Feature::PassTouchdown,
        Feature::PassingYards,
        Feature::Cpoe,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn column(&self) -> &'static str {
        match self {
            Feature::CompletionPercentage => "completion_percentage",
            Feature::PassAttempts => "pass_attempts",
            Feature::AirYards => "air_yards",
            Feature::YardsAfterCatch => "yards_after_catch",
            Feature::Epa => "epa",
            Feature::Interception => "interception",
            Feature::QbHit => "qb_hit",
            Feature::Sack => "sack",
            Feature::PassTouchdown => "pass_touchdown",
            Feature::PassingYards => "passing_yards",
            Feature::Cpoe => "cpoe",
        }
    }

    /// Name of the smoothed output column
    pub fn smoothed_column(&self) -> String {
        format!("{}_ewma", self.column())
    }

    /// Metric copied straight through, if this feature is not derived
    fn passthrough(&self) -> Option<Metric> {
        match self {
            Feature::CompletionPercentage | Feature::PassAttempts => None,
            Feature::AirYards => Some(Metric::AirYards),
            Feature::YardsAfterCatch => Some(Metric::YardsAfterCatch),
            Feature::Epa => Some(Metric::Epa),
            Feature::Interception => Some(Metric::Interception),
            Feature::QbHit => Some(Metric::QbHit),
            Feature::Sack => Some(Metric::Sack),
            Feature::PassTouchdown => Some(Metric::PassTouchdown),
            Feature::PassingYards => Some(Metric::PassingYards),
            Feature::Cpoe => Some(Metric::Cpoe),
        }
    }
}

/// One entity-week with derived features, before smoothing
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyFeatures {
    pub entity: String,
    pub season: u16,
    pub week: u8,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub roof: Option<String>,
    pub surface: Option<String>,
    pub home_flag: bool,
    /// Raw feature values, indexed by `Feature::index`
    pub values: [f64; Feature::COUNT],
}

impl WeeklyFeatures {
    pub fn value(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }
}

/// `numerator / denominator`, or `DivisionUndefined` for a zero denominator
pub fn checked_ratio(numerator: f64, denominator: f64, what: &str) -> Result<f64> {
    if denominator == 0.0 || denominator.is_nan() {
        return Err(GridironError::DivisionUndefined(format!(
            "{}: {} / {}",
            what, numerator, denominator
        )));
    }
    Ok(numerator / denominator)
}

/// Derive the raw feature vector for one aggregated row
pub fn derive(record: &EntityWeek, kind: EntityKind) -> WeeklyFeatures {
    let completed = record.metric(Metric::CompletePass);
    let incomplete = record.metric(Metric::IncompletePass);
    let attempts = completed + incomplete;

    let completion_percentage = checked_ratio(completed, attempts, "completion_percentage")
        .unwrap_or_else(|e| {
            log::debug!("{} {} wk{}: {}", record.entity, record.season, record.week, e);
            f64::NAN
        });

    let mut values = [f64::NAN; Feature::COUNT];
    for feature in Feature::ALL {
        values[feature.index()] = match feature {
            Feature::CompletionPercentage => completion_percentage,
            Feature::PassAttempts => attempts,
            _ => feature
                .passthrough()
                .map(|metric| record.metric(metric))
                .unwrap_or(f64::NAN),
        };
    }

    // neutral-site games still compare against the listed home team
    let home_flag = match (record.home_team.as_deref(), record.team(kind)) {
        (Some(home), Some(team)) => home == team,
        _ => false,
    };

    WeeklyFeatures {
        entity: record.entity.clone(),
        season: record.season,
        week: record.week,
        posteam: record.posteam.clone(),
        defteam: record.defteam.clone(),
        roof: record.roof.clone(),
        surface: record.surface.clone(),
        home_flag,
        values,
    }
}
