//! Data ingestion
//!
//! Play-by-play decoding, season stat tables, and the sources that feed them.

pub mod events;
pub mod merge;
pub mod season_table;
pub mod sources;

pub use events::{PlayEvent, RawValue, PLAY_COLUMNS};
pub use merge::TableMerger;
pub use season_table::{SeasonTable, StatCell};
