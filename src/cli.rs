//! Command-line interface definitions and argument parsing

use chrono::NaiveDate;
use clap::Parser;

use crate::error::InsightError;
use crate::filter::FilterCriteria;

/// Retail transaction insight engine: rankings, performance tiers,
/// cross-tabs and rule-based recommendations over a transaction CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "transactions.csv")]
    pub input: String,

    /// Restrict the analysis to one city (case-insensitive)
    #[arg(short, long)]
    pub city: Option<String>,

    /// Restrict the analysis to one store format (case-insensitive)
    #[arg(short = 'f', long)]
    pub store_format: Option<String>,

    /// Start of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// How many entries to show per ranking table
    #[arg(short, long, default_value = "5")]
    pub top: usize,

    /// Write the filtered rows to this path as a canonical CSV
    #[arg(short, long)]
    pub export: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the filter criteria from the parsed flags. A range needs both
    /// ends: an open-ended `--from` or `--to` is rejected here rather than
    /// silently ignored.
    pub fn criteria(&self) -> crate::Result<FilterCriteria> {
        let criteria = FilterCriteria {
            city: self.city.clone(),
            store_format: self.store_format.clone(),
            ..Default::default()
        };

        match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                criteria.with_date_range(parse_date(from)?, parse_date(to)?)
            }
            (None, None) => Ok(criteria),
            (Some(open), None) | (None, Some(open)) => Err(InsightError::InvalidDate(format!(
                "{} (both --from and --to are required for a date range)",
                open
            ))),
        }
    }
}

fn parse_date(text: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| InsightError::InvalidDate(text.to_string()))
}
