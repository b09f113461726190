//! RetailInsight: a Rust analytics engine for flat retail-transaction tables
//!
//! This library ingests a CSV of sale lines with free-form column names,
//! normalizes it against a canonical schema, and derives rankings,
//! performance tiers, cross-tabulations and rule-based recommendations
//! across dimensions such as city, department, campaign and demographics.

pub mod aggregate;
pub mod cli;
pub mod crosstab;
pub mod data;
pub mod error;
pub mod filter;
pub mod rank;
pub mod recommend;
pub mod schema;

// Re-export public items for easier access
pub use aggregate::{group_aggregate, AggregateRow, Dimension, KpiSummary, Metric};
pub use cli::Args;
pub use crosstab::CrossTab;
pub use data::{
    load_normalized, load_normalized_from, write_filtered_csv, AgeGroup, NormalizedTable,
    SkipStats, Transaction,
};
pub use error::InsightError;
pub use filter::{EmptyResultWarning, FilterCriteria, FilteredTable};
pub use rank::{
    classify_quadrants, rank, star_ratings, Direction, Quadrant, QuadrantEntry, RankedEntry,
    RatedEntry, StarRating,
};
pub use recommend::{recommend, Recommendation};
pub use schema::ColumnMap;

/// Common result type used throughout the engine
pub type Result<T> = std::result::Result<T, InsightError>;
