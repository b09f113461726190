//! Global filter engine
//!
//! Filters are an explicit, immutable criteria object passed into the
//! engine — the caller owns whatever session state produced them. Each
//! predicate is optional (absent = no restriction) and the predicates
//! combine with logical AND. Zero matching rows is a legal outcome that
//! downstream stages must absorb, so the filtered table carries an
//! `EmptyResultWarning` instead of raising.

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::{NormalizedTable, Transaction};
use crate::error::InsightError;
use crate::Result;

/// Marker for "the filters matched nothing" — distinct from a broken data
/// source, which surfaces as an `InsightError` during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmptyResultWarning;

/// Optional global filters. All present predicates must hold for a row to
/// pass; the date range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub city: Option<String>,
    pub store_format: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterCriteria {
    /// Validates an optional date range, rejecting ranges where the start
    /// falls after the end.
    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(InsightError::InvalidDateRange { from, to });
        }
        self.date_range = Some((from, to));
        Ok(self)
    }

    fn matches(&self, tx: &Transaction) -> bool {
        if let Some(city) = &self.city {
            if !tx.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(format) = &self.store_format {
            if !tx.store_format.eq_ignore_ascii_case(format) {
                return false;
            }
        }
        if let Some((from, to)) = self.date_range {
            // Rows with no parseable date only drop out when a date filter
            // is active.
            match tx.date {
                Some(d) => {
                    if d < from || d > to {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Applies the filters, producing an independent working subset.
    /// Applying the same criteria to its own output is idempotent.
    pub fn apply(&self, table: &NormalizedTable) -> FilteredTable {
        let rows: Vec<Transaction> = table
            .rows
            .iter()
            .filter(|tx| self.matches(tx))
            .cloned()
            .collect();
        FilteredTable {
            rows,
            criteria: self.clone(),
        }
    }
}

/// The working subset all aggregation, ranking, cross-tab and
/// recommendation stages read from. Owned by the invoking request and
/// discarded after use; recomputed fresh on every filter change.
#[derive(Debug, Clone)]
pub struct FilteredTable {
    pub rows: Vec<Transaction>,
    pub criteria: FilterCriteria,
}

impl FilteredTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `Some` when the current filters matched no rows.
    pub fn warning(&self) -> Option<EmptyResultWarning> {
        if self.rows.is_empty() {
            Some(EmptyResultWarning)
        } else {
            None
        }
    }
}
