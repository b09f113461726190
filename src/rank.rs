//! Ranking, star ratings and quadrant classification
//!
//! All tiers here are relative to the current filtered view: cut points
//! are recomputed from the distribution on every call, never taken from
//! absolute thresholds. The split rules are fixed and documented on each
//! function — median split for quadrants, quartile cut points for stars.

use std::cmp::Ordering;

use serde::Serialize;

use crate::aggregate::{AggregateRow, Metric};

/// Sort direction for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// An aggregate row with its assigned dense rank (1-based).
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub row: AggregateRow,
    pub rank: u32,
}

/// Star tier within the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StarRating {
    One,
    Two,
    Three,
}

impl StarRating {
    pub fn stars(self) -> u8 {
        match self {
            StarRating::One => 1,
            StarRating::Two => 2,
            StarRating::Three => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StarRating::Three => "*** Excellent",
            StarRating::Two => "** Good",
            StarRating::One => "* Poor",
        }
    }
}

/// An aggregate row with its star rating.
#[derive(Debug, Clone, Serialize)]
pub struct RatedEntry {
    pub row: AggregateRow,
    pub rating: StarRating,
}

/// Joint revenue/quantity performance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quadrant {
    /// High revenue, high quantity.
    Star,
    /// High revenue, low quantity.
    Premium,
    /// Low revenue, high quantity.
    Volume,
    /// Low revenue, low quantity.
    Laggard,
}

impl Quadrant {
    pub fn label(self) -> &'static str {
        match self {
            Quadrant::Star => "Star",
            Quadrant::Premium => "Premium",
            Quadrant::Volume => "Volume",
            Quadrant::Laggard => "Laggard",
        }
    }
}

/// An aggregate row with its quadrant class.
#[derive(Debug, Clone, Serialize)]
pub struct QuadrantEntry {
    pub row: AggregateRow,
    pub quadrant: Quadrant,
}

/// Stars go to rows strictly above the 0.75 quantile of the metric
/// distribution; the middle tier sits strictly above the 0.25 quantile.
pub const STAR_TOP_QUANTILE: f64 = 0.75;
pub const STAR_MID_QUANTILE: f64 = 0.25;

fn compare_metric(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Sorts by the metric in the given direction and assigns dense ranks:
/// equal metric values share a rank, and the next distinct value takes the
/// next rank. Ties are ordered deterministically by the lexicographic order
/// of the group keys so output is stable across runs.
pub fn rank(rows: &[AggregateRow], metric: Metric, direction: Direction) -> Vec<RankedEntry> {
    let mut sorted: Vec<AggregateRow> = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ord = match direction {
            Direction::Ascending => compare_metric(metric.of(a), metric.of(b)),
            Direction::Descending => compare_metric(metric.of(b), metric.of(a)),
        };
        ord.then_with(|| a.keys.cmp(&b.keys))
    });

    let mut entries = Vec::with_capacity(sorted.len());
    let mut current_rank = 0u32;
    let mut prev_value: Option<f64> = None;

    for row in sorted {
        let value = metric.of(&row);
        if prev_value != Some(value) {
            current_rank += 1;
            prev_value = Some(value);
        }
        entries.push(RankedEntry {
            row,
            rank: current_rank,
        });
    }

    entries
}

/// Quantile with linear interpolation between closest ranks (the same rule
/// pandas applies by default). `values` need not be sorted.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| compare_metric(*a, *b));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Assigns star ratings relative to the metric distribution of the given
/// rows: strictly above the `STAR_TOP_QUANTILE` cut = three stars, strictly
/// above `STAR_MID_QUANTILE` = two, else one. Cut points come from the rows
/// passed in, so ratings always reflect the current filtered view. Output
/// preserves input order.
pub fn star_ratings(rows: &[AggregateRow], metric: Metric) -> Vec<RatedEntry> {
    if rows.is_empty() {
        return Vec::new();
    }

    let values: Vec<f64> = rows.iter().map(|r| metric.of(r)).collect();
    let top_cut = quantile(&values, STAR_TOP_QUANTILE);
    let mid_cut = quantile(&values, STAR_MID_QUANTILE);

    rows.iter()
        .map(|row| {
            let v = metric.of(row);
            let rating = if v > top_cut {
                StarRating::Three
            } else if v > mid_cut {
                StarRating::Two
            } else {
                StarRating::One
            };
            RatedEntry {
                row: row.clone(),
                rating,
            }
        })
        .collect()
}

/// Classifies every row into exactly one quadrant by median split: a row is
/// "high" on an axis when its metric is strictly greater than that axis's
/// median across the given rows. This is the one fixed rule — no tertiles,
/// no absolute thresholds. Output preserves input order.
pub fn classify_quadrants(
    rows: &[AggregateRow],
    revenue_metric: Metric,
    qty_metric: Metric,
) -> Vec<QuadrantEntry> {
    if rows.is_empty() {
        return Vec::new();
    }

    let revenues: Vec<f64> = rows.iter().map(|r| revenue_metric.of(r)).collect();
    let quantities: Vec<f64> = rows.iter().map(|r| qty_metric.of(r)).collect();
    let revenue_median = quantile(&revenues, 0.5);
    let qty_median = quantile(&quantities, 0.5);

    rows.iter()
        .map(|row| {
            let high_revenue = revenue_metric.of(row) > revenue_median;
            let high_qty = qty_metric.of(row) > qty_median;
            let quadrant = match (high_revenue, high_qty) {
                (true, true) => Quadrant::Star,
                (true, false) => Quadrant::Premium,
                (false, true) => Quadrant::Volume,
                (false, false) => Quadrant::Laggard,
            };
            QuadrantEntry {
                row: row.clone(),
                quadrant,
            }
        })
        .collect()
}
