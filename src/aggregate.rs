//! Grouped aggregation over the filtered working set
//!
//! Grouping keys are tuples of dimension values; metrics are accumulated
//! per group. Groups are kept in an ordered map so output is deterministic
//! regardless of input row order — the engine imposes no metric ordering of
//! its own, callers sort (see `rank`).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::Transaction;

/// Categorical attributes available for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    City,
    Zone,
    StoreFormat,
    Department,
    Category,
    Product,
    Campaign,
    Channel,
    AgeGroup,
    Gender,
    Nationality,
    CustomerType,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::City => "City",
            Dimension::Zone => "Zone",
            Dimension::StoreFormat => "Store Format",
            Dimension::Department => "Department",
            Dimension::Category => "Category",
            Dimension::Product => "Product",
            Dimension::Campaign => "Campaign",
            Dimension::Channel => "Channel",
            Dimension::AgeGroup => "Age Group",
            Dimension::Gender => "Gender",
            Dimension::Nationality => "Nationality",
            Dimension::CustomerType => "Customer Type",
        }
    }

    /// The value this dimension takes for one transaction.
    pub fn value_of<'a>(self, tx: &'a Transaction) -> &'a str {
        match self {
            Dimension::City => &tx.city,
            Dimension::Zone => &tx.zone,
            Dimension::StoreFormat => &tx.store_format,
            Dimension::Department => &tx.department,
            Dimension::Category => &tx.category,
            Dimension::Product => &tx.product,
            Dimension::Campaign => &tx.campaign,
            Dimension::Channel => &tx.channel,
            Dimension::AgeGroup => tx.age_group.label(),
            Dimension::Gender => &tx.gender,
            Dimension::Nationality => &tx.nationality,
            Dimension::CustomerType => &tx.customer_type,
        }
    }
}

/// Numeric measures derivable from a group of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    /// Sum of sale-line amounts.
    TotalSales,
    /// Sum of unit quantities.
    TotalQuantity,
    /// Count of distinct transaction ids.
    Transactions,
    /// Mean sale-line amount.
    AvgSale,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalSales => "Total Sales",
            Metric::TotalQuantity => "Quantity",
            Metric::Transactions => "Transactions",
            Metric::AvgSale => "Avg Sale",
        }
    }

    pub fn of(self, row: &AggregateRow) -> f64 {
        match self {
            Metric::TotalSales => row.total_sales,
            Metric::TotalQuantity => row.total_quantity as f64,
            Metric::Transactions => row.transactions as f64,
            Metric::AvgSale => row.avg_sale,
        }
    }
}

/// One group's aggregated metrics. `keys` holds the dimension values in
/// the order the dimensions were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub total_sales: f64,
    pub total_quantity: u64,
    pub transactions: usize,
    pub lines: usize,
    pub avg_sale: f64,
}

impl AggregateRow {
    /// Joined key label for display ("Dubai / Dairy").
    pub fn key_label(&self) -> String {
        self.keys.join(" / ")
    }
}

#[derive(Default)]
struct Accumulator {
    sales: f64,
    quantity: u64,
    lines: usize,
    txn_ids: BTreeSet<String>,
}

/// Groups the rows by one or more dimensions and aggregates all metrics.
///
/// Single- and two-dimension grouping share these exact semantics; rows
/// with equal key tuples merge. An empty input produces an empty output.
pub fn group_aggregate(rows: &[Transaction], dims: &[Dimension]) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<Vec<String>, Accumulator> = BTreeMap::new();

    for tx in rows {
        let key: Vec<String> = dims.iter().map(|d| d.value_of(tx).to_string()).collect();
        let acc = groups.entry(key).or_default();
        acc.sales += tx.amount;
        acc.quantity += u64::from(tx.quantity);
        acc.lines += 1;
        acc.txn_ids.insert(tx.transaction_id.clone());
    }

    groups
        .into_iter()
        .map(|(keys, acc)| AggregateRow {
            keys,
            total_sales: acc.sales,
            total_quantity: acc.quantity,
            transactions: acc.txn_ids.len(),
            lines: acc.lines,
            avg_sale: acc.sales / acc.lines as f64,
        })
        .collect()
}

/// Headline figures for the current working set.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KpiSummary {
    pub total_sales: f64,
    pub transactions: usize,
    /// Mean of per-transaction sale totals.
    pub avg_basket: f64,
    /// Share of sale lines carrying a promo code, in percent.
    pub promo_rate: f64,
}

impl KpiSummary {
    pub fn compute(rows: &[Transaction]) -> KpiSummary {
        if rows.is_empty() {
            return KpiSummary {
                total_sales: 0.0,
                transactions: 0,
                avg_basket: 0.0,
                promo_rate: 0.0,
            };
        }

        let total_sales: f64 = rows.iter().map(|t| t.amount).sum();

        let mut baskets: BTreeMap<&str, f64> = BTreeMap::new();
        for tx in rows {
            *baskets.entry(tx.transaction_id.as_str()).or_insert(0.0) += tx.amount;
        }
        let transactions = baskets.len();
        let avg_basket = baskets.values().sum::<f64>() / transactions as f64;

        let promo_lines = rows.iter().filter(|t| t.promo_used).count();
        let promo_rate = promo_lines as f64 / rows.len() as f64 * 100.0;

        KpiSummary {
            total_sales,
            transactions,
            avg_basket,
            promo_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_normalized_from;
    use std::io::Cursor;

    fn sample_rows() -> Vec<Transaction> {
        let csv = "\
Invoice,City,Dept,Amount,Qty,Promo
T1,Dubai,Dairy,100.0,10,SAVE10
T1,Dubai,Snacks,20.0,2,SAVE10
T2,Dubai,Dairy,50.0,5,
T3,Abu Dhabi,Dairy,200.0,4,
T4,Abu Dhabi,Snacks,80.0,8,FEST5
";
        load_normalized_from(Cursor::new(csv)).unwrap().rows
    }

    #[test]
    fn test_single_dimension_grouping() {
        let rows = sample_rows();
        let agg = group_aggregate(&rows, &[Dimension::City]);

        assert_eq!(agg.len(), 2);
        let dubai = agg.iter().find(|r| r.keys == ["Dubai"]).unwrap();
        assert_eq!(dubai.total_sales, 170.0);
        assert_eq!(dubai.total_quantity, 17);
        assert_eq!(dubai.transactions, 2); // T1 appears twice, counted once
        assert_eq!(dubai.lines, 3);
    }

    #[test]
    fn test_two_dimension_grouping() {
        let rows = sample_rows();
        let agg = group_aggregate(&rows, &[Dimension::Department, Dimension::City]);

        assert_eq!(agg.len(), 4);
        let cell = agg
            .iter()
            .find(|r| r.keys == ["Dairy", "Dubai"])
            .unwrap();
        assert_eq!(cell.total_sales, 150.0);
        assert_eq!(cell.key_label(), "Dairy / Dubai");
    }

    #[test]
    fn test_order_independence() {
        let rows = sample_rows();
        let forward = group_aggregate(&rows, &[Dimension::City]);

        let mut shuffled = rows.clone();
        shuffled.reverse();
        shuffled.rotate_left(2);
        let backward = group_aggregate(&shuffled, &[Dimension::City]);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_input_empty_output() {
        let agg = group_aggregate(&[], &[Dimension::City]);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_metric_accessors() {
        let rows = sample_rows();
        let agg = group_aggregate(&rows, &[Dimension::City]);
        let dubai = agg.iter().find(|r| r.keys == ["Dubai"]).unwrap();

        assert_eq!(Metric::TotalSales.of(dubai), 170.0);
        assert_eq!(Metric::TotalQuantity.of(dubai), 17.0);
        assert_eq!(Metric::Transactions.of(dubai), 2.0);
        assert!((Metric::AvgSale.of(dubai) - 170.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_kpi_summary() {
        let rows = sample_rows();
        let kpi = KpiSummary::compute(&rows);

        assert_eq!(kpi.total_sales, 450.0);
        assert_eq!(kpi.transactions, 4);
        // Baskets: T1=120, T2=50, T3=200, T4=80 → mean 112.5
        assert!((kpi.avg_basket - 112.5).abs() < 1e-9);
        // 3 of 5 lines carry a promo code
        assert!((kpi.promo_rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = KpiSummary::compute(&[]);
        assert_eq!(kpi.total_sales, 0.0);
        assert_eq!(kpi.transactions, 0);
    }
}
