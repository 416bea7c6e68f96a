//! Feature extraction
//!
//! Converts play-level events into smoothed, model-ready weekly features.

pub mod aggregate;
pub mod derive;
pub mod ewma;
pub mod pipeline;

pub use aggregate::{Aggregator, EntityWeek, Metric, Reduction};
pub use derive::{Feature, WeeklyFeatures};
pub use ewma::Ewma;
pub use pipeline::{build_all, build_table, FeaturePipeline, FeatureRow, FeatureTable, WeeklyTables};
