//! Entity-week aggregation
//!
//! Groups plays by (entity, season, week) and reduces every group to a
//! single row. Each metric declares how it is reduced.

use std::collections::BTreeMap;

use crate::data::events::PlayEvent;
use crate::EntityKind;

/// How a numeric metric is collapsed within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Additive counting metric; missing values are skipped, an all-missing group sums to 0
    Sum,
    /// Rate already normalised per play; missing values are skipped, an all-missing group is NaN
    Mean,
}

/// Numeric play-level metrics carried into the weekly row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    AirYards,
    YardsAfterCatch,
    Epa,
    CompletePass,
    IncompletePass,
    Interception,
    QbHit,
    Sack,
    PassTouchdown,
    PassingYards,
    Cpoe,
}

impl Metric {
    pub const COUNT: usize = 11;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::AirYards,
        Metric::YardsAfterCatch,
        Metric::Epa,
        Metric::CompletePass,
        Metric::IncompletePass,
        Metric::Interception,
        Metric::QbHit,
        Metric::Sack,
        Metric::PassTouchdown,
        Metric::PassingYards,
        Metric::Cpoe,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn reduction(&self) -> Reduction {
        match self {
            // completion probability over expectation is already per play
            Metric::Cpoe => Reduction::Mean,
            _ => Reduction::Sum,
        }
    }

    pub fn value(&self, event: &PlayEvent) -> Option<f64> {
        match self {
            Metric::AirYards => event.air_yards,
            Metric::YardsAfterCatch => event.yards_after_catch,
            Metric::Epa => event.epa,
            Metric::CompletePass => event.complete_pass,
            Metric::IncompletePass => event.incomplete_pass,
            Metric::Interception => event.interception,
            Metric::QbHit => event.qb_hit,
            Metric::Sack => event.sack,
            Metric::PassTouchdown => event.pass_touchdown,
            Metric::PassingYards => event.passing_yards,
            Metric::Cpoe => event.cpoe,
        }
    }
}

/// Contextual fields assumed constant within a group. Each is reduced to
/// its first non-missing value in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Posteam,
    Defteam,
    HomeTeam,
    AwayTeam,
    Roof,
    Surface,
}

impl ContextField {
    pub const COUNT: usize = 6;

    pub const ALL: [ContextField; ContextField::COUNT] = [
        ContextField::Posteam,
        ContextField::Defteam,
        ContextField::HomeTeam,
        ContextField::AwayTeam,
        ContextField::Roof,
        ContextField::Surface,
    ];

    fn value<'a>(&self, event: &'a PlayEvent) -> Option<&'a str> {
        match self {
            ContextField::Posteam => event.posteam.as_deref(),
            ContextField::Defteam => event.defteam.as_deref(),
            ContextField::HomeTeam => event.home_team.as_deref(),
            ContextField::AwayTeam => event.away_team.as_deref(),
            ContextField::Roof => event.roof.as_deref(),
            ContextField::Surface => event.surface.as_deref(),
        }
    }
}

/// One row per (entity, season, week)
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWeek {
    pub entity: String,
    pub season: u16,
    pub week: u8,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub roof: Option<String>,
    pub surface: Option<String>,
    /// Reduced metric values, indexed by `Metric::index`
    pub metrics: [f64; Metric::COUNT],
    /// Number of plays folded into this row
    pub plays: usize,
}

impl EntityWeek {
    pub fn metric(&self, metric: Metric) -> f64 {
        self.metrics[metric.index()]
    }

    /// Team the entity played for in this game
    pub fn team(&self, kind: EntityKind) -> Option<&str> {
        match kind {
            EntityKind::Passer => self.posteam.as_deref(),
            EntityKind::Defense => self.defteam.as_deref(),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    sums: [f64; Metric::COUNT],
    counts: [usize; Metric::COUNT],
    context: [Option<String>; ContextField::COUNT],
    plays: usize,
}

impl Accumulator {
    fn add(&mut self, event: &PlayEvent) {
        self.plays += 1;

        for metric in Metric::ALL {
            let Some(value) = metric.value(event) else {
                continue;
            };
            let i = metric.index();
            self.sums[i] += value;
            self.counts[i] += 1;
        }

        for (slot, field) in self.context.iter_mut().zip(ContextField::ALL) {
            if slot.is_none() {
                *slot = field.value(event).map(str::to_string);
            }
        }
    }

    fn finish(self, entity: String, season: u16, week: u8) -> EntityWeek {
        let mut metrics = [f64::NAN; Metric::COUNT];
        for metric in Metric::ALL {
            let i = metric.index();
            metrics[i] = match metric.reduction() {
                Reduction::Sum => self.sums[i],
                Reduction::Mean if self.counts[i] > 0 => self.sums[i] / self.counts[i] as f64,
                Reduction::Mean => f64::NAN,
            };
        }

        let [posteam, defteam, home_team, away_team, roof, surface] = self.context;

        EntityWeek {
            entity,
            season,
            week,
            posteam,
            defteam,
            home_team,
            away_team,
            roof,
            surface,
            metrics,
            plays: self.plays,
        }
    }
}

/// Reduces plays to entity-week rows for one grouping key
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    kind: EntityKind,
}

impl Aggregator {
    pub fn new(kind: EntityKind) -> Self {
        Aggregator { kind }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Aggregate already-filtered plays.
    ///
    /// Output is ordered by entity, then season, then week. Plays without
    /// an entity identity are dropped.
    pub fn aggregate<'a, I>(&self, events: I) -> Vec<EntityWeek>
    where
        I: IntoIterator<Item = &'a PlayEvent>,
    {
        let mut groups: BTreeMap<(String, u16, u8), Accumulator> = BTreeMap::new();
        let mut unkeyed = 0usize;

        for event in events {
            let Some(entity) = event.entity(self.kind) else {
                unkeyed += 1;
                continue;
            };
            groups
                .entry((entity.to_string(), event.season, event.week))
                .or_default()
                .add(event);
        }

        if unkeyed > 0 {
            log::debug!(
                "Dropped {} plays without a {}",
                unkeyed,
                self.kind.key_column()
            );
        }

        groups
            .into_iter()
            .map(|((entity, season, week), acc)| acc.finish(entity, season, week))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pass(passer: &str, season: u16, week: u8, complete: f64, yards: f64) -> PlayEvent {
        PlayEvent {
            passer_player_name: Some(passer.to_string()),
            posteam: Some("KC".to_string()),
            defteam: Some("DET".to_string()),
            season,
            week,
            home_team: Some("KC".to_string()),
            away_team: Some("DET".to_string()),
            play_type: Some("pass".to_string()),
            air_yards: Some(yards),
            yards_after_catch: Some(0.0),
            epa: Some(0.5),
            complete_pass: Some(complete),
            incomplete_pass: Some(1.0 - complete),
            interception: Some(0.0),
            qb_hit: Some(0.0),
            sack: Some(0.0),
            pass_touchdown: Some(0.0),
            passing_yards: Some(yards * complete),
            cpoe: Some(complete * 10.0),
            roof: Some("outdoors".to_string()),
            surface: Some("grass".to_string()),
        }
    }

    #[test]
    fn test_one_row_per_key() {
        let events = vec![
            make_pass("A", 2023, 1, 1.0, 10.0),
            make_pass("A", 2023, 1, 0.0, 5.0),
            make_pass("A", 2023, 2, 1.0, 7.0),
            make_pass("B", 2023, 1, 1.0, 3.0),
        ];
        let rows = Aggregator::new(EntityKind::Passer).aggregate(&events);
        assert_eq!(rows.len(), 3);

        let first = &rows[0];
        assert_eq!((first.entity.as_str(), first.season, first.week), ("A", 2023, 1));
        assert_eq!(first.plays, 2);
        assert_eq!(first.metric(Metric::AirYards), 15.0);
        assert_eq!(first.metric(Metric::CompletePass), 1.0);
        assert_eq!(first.metric(Metric::IncompletePass), 1.0);
        // mean of 10 and 0
        assert_eq!(first.metric(Metric::Cpoe), 5.0);
        assert_eq!(first.posteam.as_deref(), Some("KC"));
        assert_eq!(first.roof.as_deref(), Some("outdoors"));
    }

    #[test]
    fn test_rows_ordered_by_season_then_week() {
        let events = vec![
            make_pass("A", 2023, 1, 1.0, 1.0),
            make_pass("A", 2022, 2, 1.0, 1.0),
            make_pass("A", 2022, 1, 1.0, 1.0),
        ];
        let rows = Aggregator::new(EntityKind::Passer).aggregate(&events);
        let order: Vec<(u16, u8)> = rows.iter().map(|r| (r.season, r.week)).collect();
        assert_eq!(order, vec![(2022, 1), (2022, 2), (2023, 1)]);
    }

    #[test]
    fn test_missing_values_skipped() {
        let mut a = make_pass("A", 2023, 1, 1.0, 10.0);
        let mut b = make_pass("A", 2023, 1, 1.0, 10.0);
        a.cpoe = None;
        b.cpoe = None;
        a.air_yards = None;
        a.roof = None;

        let rows = Aggregator::new(EntityKind::Passer).aggregate(&[a, b]);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].metric(Metric::Cpoe).is_nan());
        assert_eq!(rows[0].metric(Metric::AirYards), 10.0);
        // first non-missing value wins
        assert_eq!(rows[0].roof.as_deref(), Some("outdoors"));
    }

    /// Turn an aggregated row back into a single play carrying its totals
    fn as_play(row: &EntityWeek) -> PlayEvent {
        let value = |metric: Metric| Some(row.metric(metric));
        PlayEvent {
            passer_player_name: Some(row.entity.clone()),
            posteam: row.posteam.clone(),
            defteam: row.defteam.clone(),
            season: row.season,
            week: row.week,
            home_team: row.home_team.clone(),
            away_team: row.away_team.clone(),
            play_type: Some("pass".to_string()),
            air_yards: value(Metric::AirYards),
            yards_after_catch: value(Metric::YardsAfterCatch),
            epa: value(Metric::Epa),
            complete_pass: value(Metric::CompletePass),
            incomplete_pass: value(Metric::IncompletePass),
            interception: value(Metric::Interception),
            qb_hit: value(Metric::QbHit),
            sack: value(Metric::Sack),
            pass_touchdown: value(Metric::PassTouchdown),
            passing_yards: value(Metric::PassingYards),
            cpoe: value(Metric::Cpoe),
            roof: row.roof.clone(),
            surface: row.surface.clone(),
        }
    }

    #[test]
    fn test_aggregating_aggregated_rows_is_unchanged() {
        let events = vec![
            make_pass("A", 2023, 1, 1.0, 12.0),
            make_pass("A", 2023, 1, 0.0, 4.0),
            make_pass("A", 2023, 1, 1.0, 9.0),
            make_pass("A", 2023, 2, 0.0, 4.0),
            make_pass("B", 2022, 17, 1.0, 8.0),
            make_pass("B", 2022, 17, 1.0, 2.0),
        ];
        let aggregator = Aggregator::new(EntityKind::Passer);
        let once = aggregator.aggregate(&events);
        let replayed: Vec<PlayEvent> = once.iter().map(as_play).collect();
        let twice = aggregator.aggregate(&replayed);

        // every group now holds one play; everything else must match
        let without_counts = |rows: Vec<EntityWeek>| -> Vec<EntityWeek> {
            rows.into_iter().map(|r| EntityWeek { plays: 0, ..r }).collect()
        };
        assert_eq!(once.len(), 3);
        assert!(twice.iter().all(|r| r.plays == 1));
        assert_eq!(without_counts(once), without_counts(twice));
    }

    #[test]
    fn test_defense_grouping_and_unkeyed_plays() {
        let mut no_def = make_pass("A", 2023, 1, 1.0, 1.0);
        no_def.defteam = None;
        let events = vec![
            make_pass("A", 2023, 1, 1.0, 1.0),
            make_pass("B", 2023, 1, 0.0, 2.0),
            no_def,
        ];
        let rows = Aggregator::new(EntityKind::Defense).aggregate(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity, "DET");
        assert_eq!(rows[0].plays, 2);
        assert_eq!(rows[0].team(EntityKind::Defense), Some("DET"));
    }
}
