//! Two-dimensional cross-tabulation over transaction rows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{group_aggregate, Dimension, Metric};
use crate::data::Transaction;

/// A complete n x m matrix of one metric across two dimensions. Every
/// observed row label is crossed with every observed column label;
/// combinations with no data hold zero rather than being dropped.
#[derive(Debug, Clone, Serialize)]
pub struct CrossTab {
    pub row_dim: &'static str,
    pub col_dim: &'static str,
    pub metric: &'static str,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// Row-major: `cells[r * col_labels.len() + c]`.
    pub cells: Vec<f64>,
}

impl CrossTab {
    /// Aggregates the metric over the (row, column) dimension pair and lays
    /// the result out as a full Cartesian matrix. Labels are the distinct
    /// values observed in the data, sorted, so the layout is deterministic.
    pub fn build(
        rows: &[Transaction],
        row_dim: Dimension,
        col_dim: Dimension,
        metric: Metric,
    ) -> CrossTab {
        let aggregates = group_aggregate(rows, &[row_dim, col_dim]);

        let mut values: BTreeMap<(String, String), f64> = BTreeMap::new();
        let mut row_labels: Vec<String> = Vec::new();
        let mut col_labels: Vec<String> = Vec::new();

        for agg in &aggregates {
            let row_key = agg.keys[0].clone();
            let col_key = agg.keys[1].clone();
            if !row_labels.contains(&row_key) {
                row_labels.push(row_key.clone());
            }
            if !col_labels.contains(&col_key) {
                col_labels.push(col_key.clone());
            }
            values.insert((row_key, col_key), metric.of(agg));
        }

        row_labels.sort();
        col_labels.sort();

        let mut cells = Vec::with_capacity(row_labels.len() * col_labels.len());
        for row_label in &row_labels {
            for col_label in &col_labels {
                let value = values
                    .get(&(row_label.clone(), col_label.clone()))
                    .copied()
                    .unwrap_or(0.0);
                cells.push(value);
            }
        }

        CrossTab {
            row_dim: row_dim.label(),
            col_dim: col_dim.label(),
            metric: metric.label(),
            row_labels,
            col_labels,
            cells,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.col_labels.len() + col]
    }

    /// Sum over one row of the matrix.
    pub fn row_total(&self, row: usize) -> f64 {
        (0..self.col_labels.len()).map(|c| self.get(row, c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_normalized_from;

    fn sample_rows() -> Vec<Transaction> {
        let csv = "\
Invoice,City,Dept,Amount,Qty,Age
T1,Dubai,Dairy,100.0,2,16
T2,Dubai,Electronics,900.0,1,30
T3,Sharjah,Dairy,50.0,5,30
T4,Sharjah,Dairy,75.0,3,70
";
        load_normalized_from(csv.as_bytes()).unwrap().rows
    }

    #[test]
    fn test_full_cartesian_matrix() {
        let rows = sample_rows();
        let tab = CrossTab::build(&rows, Dimension::City, Dimension::Department, Metric::TotalSales);

        assert_eq!(tab.row_labels, ["Dubai", "Sharjah"]);
        assert_eq!(tab.col_labels, ["Dairy", "Electronics"]);
        // 2 cities x 2 departments = 4 cells, even though Sharjah never
        // sold Electronics.
        assert_eq!(tab.cells.len(), 4);
        assert_eq!(tab.get(0, 0), 100.0);
        assert_eq!(tab.get(0, 1), 900.0);
        assert_eq!(tab.get(1, 0), 125.0);
        assert_eq!(tab.get(1, 1), 0.0);
    }

    #[test]
    fn test_row_totals() {
        let rows = sample_rows();
        let tab = CrossTab::build(&rows, Dimension::City, Dimension::Department, Metric::TotalSales);
        assert_eq!(tab.row_total(0), 1000.0);
        assert_eq!(tab.row_total(1), 125.0);
    }

    #[test]
    fn test_age_group_axis() {
        let rows = sample_rows();
        let tab = CrossTab::build(
            &rows,
            Dimension::AgeGroup,
            Dimension::Department,
            Metric::Transactions,
        );
        // Teens (16), Adults (30, 30), Elder (70).
        assert_eq!(tab.row_labels.len(), 3);
        assert_eq!(tab.cells.len(), tab.row_labels.len() * tab.col_labels.len());
    }

    #[test]
    fn test_empty_input_yields_empty_matrix() {
        let tab = CrossTab::build(&[], Dimension::City, Dimension::Department, Metric::TotalSales);
        assert!(tab.row_labels.is_empty());
        assert!(tab.col_labels.is_empty());
        assert!(tab.cells.is_empty());
    }
}
