//! RetailInsight: retail transaction analytics CLI
//!
//! This is the main entrypoint that orchestrates loading, filtering,
//! aggregation, ranking, cross-tabulation and recommendations.

use anyhow::Result;
use clap::Parser;
use retail_insight::{
    classify_quadrants, group_aggregate, rank, recommend, star_ratings, write_filtered_csv, Args,
    CrossTab, Dimension, Direction, FilteredTable, KpiSummary, Metric, RankedEntry,
};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    if args.verbose {
        println!("RetailInsight - Transaction Analytics");
        println!("=====================================\n");
    }

    run_pipeline(&args)?;

    Ok(())
}

/// Run the full analysis pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Insight Pipeline ===\n");

    let start_time = Instant::now();

    // Step 1: Load and normalize data
    if args.verbose {
        println!("Step 1: Loading and normalizing data");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let table = retail_insight::load_normalized(&args.input)?;
    let load_time = load_start.elapsed();

    println!("✓ Data loaded: {} transactions", table.rows.len());
    if table.skipped.total() > 0 {
        println!(
            "  Skipped {} invalid rows ({} bad amount, {} bad quantity, {} bad age)",
            table.skipped.total(),
            table.skipped.bad_amount,
            table.skipped.bad_quantity,
            table.skipped.bad_age
        );
    }
    if args.verbose {
        println!("  Loading time: {:.2}s", load_time.as_secs_f64());
    }

    // Step 2: Apply filters
    let criteria = args.criteria()?;
    if args.verbose {
        println!("\nStep 2: Applying filters");
        println!("  City: {}", criteria.city.as_deref().unwrap_or("(all)"));
        println!(
            "  Store format: {}",
            criteria.store_format.as_deref().unwrap_or("(all)")
        );
        match criteria.date_range {
            Some((from, to)) => println!("  Date range: {} to {} (inclusive)", from, to),
            None => println!("  Date range: (all)"),
        }
    }

    let view = criteria.apply(&table);
    if view.warning().is_some() {
        println!("\n⚠ No transactions match the current filters.");
        println!("  Relax the city, store format or date range and try again.");
        return Ok(());
    }
    println!("✓ Filters applied: {} transactions in view", view.len());

    // Step 3: Headline KPIs
    let kpi = KpiSummary::compute(&view.rows);
    println!("\n=== Headline KPIs ===");
    println!("Total sales:        {:.2}", kpi.total_sales);
    println!("Transactions:       {}", kpi.transactions);
    println!("Avg basket:         {:.2}", kpi.avg_basket);
    println!("Promo usage:        {:.1}%", kpi.promo_rate);

    // Step 4: Rankings
    print_ranking(&view, Dimension::City, args.top);
    print_ranking(&view, Dimension::Department, args.top);
    print_ranking(&view, Dimension::Campaign, args.top);

    // Step 5: Campaign star ratings
    let campaigns = group_aggregate(&view.rows, &[Dimension::Campaign]);
    if !campaigns.is_empty() {
        println!("\n=== Campaign Ratings ===");
        let mut rated = star_ratings(&campaigns, Metric::TotalSales);
        rated.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.row.keys.cmp(&b.row.keys))
        });
        for entry in &rated {
            println!(
                "{:<24} {:>12.2}  {}",
                entry.row.key_label(),
                entry.row.total_sales,
                entry.rating.label()
            );
        }
    }

    // Step 6: Department quadrants
    let departments = group_aggregate(&view.rows, &[Dimension::Department]);
    if !departments.is_empty() {
        println!("\n=== Department Quadrants ===");
        for entry in classify_quadrants(&departments, Metric::TotalSales, Metric::TotalQuantity) {
            println!(
                "{:<24} sales {:>12.2}  qty {:>8}  -> {}",
                entry.row.key_label(),
                entry.row.total_sales,
                entry.row.total_quantity,
                entry.quadrant.label()
            );
        }
    }

    // Step 7: Cross-tabs
    let pairs = [
        (Dimension::AgeGroup, Dimension::Department, Metric::TotalSales),
        (Dimension::Campaign, Dimension::AgeGroup, Metric::Transactions),
        (Dimension::City, Dimension::StoreFormat, Metric::TotalSales),
    ];
    for (row_dim, col_dim, metric) in pairs {
        let tab = CrossTab::build(&view.rows, row_dim, col_dim, metric);
        if !tab.cells.is_empty() {
            print_crosstab(&tab);
        }
    }

    // Step 8: Recommendations
    let recs = recommend(&view);
    if !recs.is_empty() {
        println!("\n=== Recommendations ===");
        for rec in &recs {
            println!("[{}] {}", rec.dimension, rec.subject);
            println!("  {}", rec.observation);
            println!("  Action: {}", rec.action);
            if let Some(uplift) = rec.expected_uplift {
                println!("  Estimated uplift: {:.2}", uplift);
            }
        }
    }

    // Step 9: Optional export of the filtered view
    if let Some(ref path) = args.export {
        let export_start = Instant::now();
        let file = std::fs::File::create(path)?;
        write_filtered_csv(&view.rows, file)?;
        println!("\n✓ Filtered rows exported to: {}", path);
        if args.verbose {
            println!("  Export time: {:.2}s", export_start.elapsed().as_secs_f64());
        }
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

/// Print the top N entries of one dimension ranked by total sales
fn print_ranking(view: &FilteredTable, dim: Dimension, top: usize) {
    let aggregates = group_aggregate(&view.rows, &[dim]);
    if aggregates.is_empty() {
        return;
    }

    println!("\n=== Top {} by Total Sales ===", dim.label());
    let ranked: Vec<RankedEntry> = rank(&aggregates, Metric::TotalSales, Direction::Descending);
    for entry in ranked.iter().take(top) {
        println!(
            "#{:<3} {:<24} {:>12.2}",
            entry.rank,
            entry.row.key_label(),
            entry.row.total_sales
        );
    }
}

/// Print a cross-tab as a fixed-width matrix with row totals
fn print_crosstab(tab: &CrossTab) {
    println!("\n=== {} x {} ({}) ===", tab.row_dim, tab.col_dim, tab.metric);

    print!("{:<12}", "");
    for col in &tab.col_labels {
        print!("{:>14}", col);
    }
    println!("{:>14}", "Total");

    for (r, row_label) in tab.row_labels.iter().enumerate() {
        print!("{:<12}", row_label);
        for c in 0..tab.col_labels.len() {
            print!("{:>14.2}", tab.get(r, c));
        }
        println!("{:>14.2}", tab.row_total(r));
    }
}
