//! Rule-based recommendations derived from the current filtered view.
//!
//! Every rule is a plain, documented heuristic over the aggregates the
//! other modules already produce. Uplift figures are estimates: the gap
//! between the subject and its benchmark, scaled by a fixed conversion
//! factor, never a forecast.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{group_aggregate, AggregateRow, Dimension, Metric};
use crate::data::Transaction;
use crate::filter::FilteredTable;
use crate::rank::{rank, star_ratings, Direction, StarRating};

/// Fraction of an observed performance gap assumed to be recoverable by
/// acting on a recommendation.
pub const UPLIFT_CONVERSION_FACTOR: f64 = 0.5;

/// Minimum difference between a department's local rank and its
/// company-wide rank before it counts as a localized opportunity.
pub const RANK_GAP_THRESHOLD: u32 = 3;

/// Star count that marks a campaign as a proven performer.
pub const TOP_STARS: u8 = 3;

/// One actionable suggestion with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Which aspect of the business the suggestion concerns.
    pub dimension: &'static str,
    /// The city, department, campaign or profile the suggestion targets.
    pub subject: String,
    /// What the data shows.
    pub observation: String,
    /// What to do about it.
    pub action: String,
    /// Estimated recoverable sales, when the rule can quantify one.
    pub expected_uplift: Option<f64>,
}

/// Runs every heuristic over the filtered view and returns the combined
/// suggestions in a fixed section order. An empty view yields an empty
/// list rather than an error.
pub fn recommend(table: &FilteredTable) -> Vec<Recommendation> {
    if table.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    close_the_gap(&table.rows, Dimension::City, &mut out);
    close_the_gap(&table.rows, Dimension::Department, &mut out);
    close_the_gap(&table.rows, Dimension::StoreFormat, &mut out);
    localized_departments(&table.rows, &mut out);
    campaign_expansion(&table.rows, &mut out);
    primary_persona(&table.rows, &mut out);
    out
}

/// Bottom performer vs top performer on total sales within one dimension.
/// Uplift is the sales gap scaled by `UPLIFT_CONVERSION_FACTOR`.
fn close_the_gap(
    rows: &[Transaction],
    dim: Dimension,
    out: &mut Vec<Recommendation>,
) {
    let aggregates = group_aggregate(rows, &[dim]);
    let named: Vec<&AggregateRow> = aggregates
        .iter()
        .filter(|a| a.keys[0] != "Unknown")
        .collect();
    if named.len() < 2 {
        return;
    }

    let owned: Vec<AggregateRow> = named.into_iter().cloned().collect();
    let ranked = rank(&owned, Metric::TotalSales, Direction::Descending);
    let best = &ranked[0].row;
    let worst = &ranked[ranked.len() - 1].row;
    let gap = best.total_sales - worst.total_sales;
    if gap <= 0.0 {
        return;
    }

    out.push(Recommendation {
        dimension: dim.label(),
        subject: worst.key_label(),
        observation: format!(
            "{} trails the leading {} ({}) by {:.2} in total sales",
            worst.key_label(),
            dim.label().to_lowercase(),
            best.key_label(),
            gap
        ),
        action: format!(
            "review pricing, stock depth and local promotions for {}",
            worst.key_label()
        ),
        expected_uplift: Some(gap * UPLIFT_CONVERSION_FACTOR),
    });
}

/// Departments that rank much higher inside one city than they do
/// company-wide. A local rank at least `RANK_GAP_THRESHOLD` places better
/// than the overall rank marks a localized preference worth stocking for.
fn localized_departments(rows: &[Transaction], out: &mut Vec<Recommendation>) {
    let company = group_aggregate(rows, &[Dimension::Department]);
    let company_rank: BTreeMap<String, u32> = rank(&company, Metric::TotalSales, Direction::Descending)
        .into_iter()
        .map(|e| (e.row.keys[0].clone(), e.rank))
        .collect();

    let by_city_dept = group_aggregate(rows, &[Dimension::City, Dimension::Department]);
    let mut per_city: BTreeMap<String, Vec<AggregateRow>> = BTreeMap::new();
    for agg in by_city_dept {
        let city = agg.keys[0].clone();
        let mut local = agg.clone();
        local.keys = vec![agg.keys[1].clone()];
        per_city.entry(city).or_default().push(local);
    }

    for (city, local_rows) in per_city {
        if city == "Unknown" {
            continue;
        }
        for entry in rank(&local_rows, Metric::TotalSales, Direction::Descending) {
            let dept = &entry.row.keys[0];
            let Some(&overall) = company_rank.get(dept) else {
                continue;
            };
            if overall > entry.rank && overall - entry.rank >= RANK_GAP_THRESHOLD {
                out.push(Recommendation {
                    dimension: "Department",
                    subject: format!("{} in {}", dept, city),
                    observation: format!(
                        "{} ranks #{} in {} versus #{} company-wide",
                        dept, entry.rank, city, overall
                    ),
                    action: format!(
                        "localize assortment and shelf space for {} in {}",
                        dept, city
                    ),
                    expected_uplift: None,
                });
            }
        }
    }
}

/// Campaigns rated three stars in at least one city but absent or rated
/// one star in others. Uplift assumes the weak cities can recover the
/// sales gap to the campaign's best city at the standard conversion rate.
fn campaign_expansion(rows: &[Transaction], out: &mut Vec<Recommendation>) {
    let by_city_campaign = group_aggregate(rows, &[Dimension::City, Dimension::Campaign]);
    let mut per_city: BTreeMap<String, Vec<AggregateRow>> = BTreeMap::new();
    let mut cities: Vec<String> = Vec::new();
    for agg in by_city_campaign {
        let city = agg.keys[0].clone();
        if !cities.contains(&city) {
            cities.push(city.clone());
        }
        let mut local = agg.clone();
        local.keys = vec![agg.keys[1].clone()];
        per_city.entry(city).or_default().push(local);
    }

    // campaign -> (city -> (rating, sales))
    let mut ratings: BTreeMap<String, BTreeMap<String, (StarRating, f64)>> = BTreeMap::new();
    for (city, local_rows) in &per_city {
        for rated in star_ratings(local_rows, Metric::TotalSales) {
            let campaign = rated.row.keys[0].clone();
            if campaign == "Unknown" {
                continue;
            }
            ratings
                .entry(campaign)
                .or_default()
                .insert(city.clone(), (rated.rating, rated.row.total_sales));
        }
    }

    for (campaign, by_city) in ratings {
        let strong: Vec<(&String, f64)> = by_city
            .iter()
            .filter(|(_, (r, _))| r.stars() == TOP_STARS)
            .map(|(c, (_, s))| (c, *s))
            .collect();
        if strong.is_empty() {
            continue;
        }

        let mut weak: Vec<String> = Vec::new();
        let mut weak_best_sales = 0.0f64;
        for city in &cities {
            match by_city.get(city) {
                None => weak.push(city.clone()),
                Some((StarRating::One, sales)) => {
                    weak.push(city.clone());
                    weak_best_sales = weak_best_sales.max(*sales);
                }
                Some(_) => {}
            }
        }
        if weak.is_empty() {
            continue;
        }

        let best_sales = strong
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let strong_cities: Vec<&str> = strong.iter().map(|(c, _)| c.as_str()).collect();

        out.push(Recommendation {
            dimension: "Campaign",
            subject: campaign.clone(),
            observation: format!(
                "{} rates three stars in {} but underperforms or is absent in {}",
                campaign,
                strong_cities.join(", "),
                weak.join(", ")
            ),
            action: format!("extend {} to {}", campaign, weak.join(", ")),
            expected_uplift: Some((best_sales - weak_best_sales) * UPLIFT_CONVERSION_FACTOR),
        });
    }
}

/// The modal shopper profile (age group x nationality x gender) and what
/// that profile actually buys, as a targeting suggestion.
fn primary_persona(rows: &[Transaction], out: &mut Vec<Recommendation>) {
    let mut counts: BTreeMap<(String, String, String), usize> = BTreeMap::new();
    for tx in rows {
        let key = (
            tx.age_group.label().to_string(),
            tx.nationality.clone(),
            tx.gender.clone(),
        );
        *counts.entry(key).or_default() += 1;
    }

    // BTreeMap iteration order makes the smallest key win ties.
    let Some((persona, _)) = counts
        .into_iter()
        .fold(None::<((String, String, String), usize)>, |acc, (k, v)| match acc {
            Some((_, best)) if best >= v => acc,
            _ => Some((k, v)),
        })
    else {
        return;
    };

    let subset: Vec<Transaction> = rows
        .iter()
        .filter(|tx| {
            tx.age_group.label() == persona.0
                && tx.nationality == persona.1
                && tx.gender == persona.2
        })
        .cloned()
        .collect();

    let top_of = |dim: Dimension| -> Option<String> {
        let aggs = group_aggregate(&subset, &[dim]);
        rank(&aggs, Metric::TotalSales, Direction::Descending)
            .first()
            .map(|e| e.row.key_label())
    };
    let (Some(dept), Some(format)) = (top_of(Dimension::Department), top_of(Dimension::StoreFormat))
    else {
        return;
    };

    out.push(Recommendation {
        dimension: "Persona",
        subject: format!("{} / {} / {}", persona.0, persona.1, persona.2),
        observation: format!(
            "the most frequent shopper profile is {} {} aged {}, spending most in {}",
            persona.1, persona.2, persona.0, dept
        ),
        action: format!(
            "target this profile with {} offers in {} stores",
            dept, format
        ),
        expected_uplift: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_normalized_from;
    use crate::filter::FilterCriteria;

    fn view(csv: &str) -> FilteredTable {
        let table = load_normalized_from(csv.as_bytes()).unwrap();
        FilterCriteria::default().apply(&table)
    }

    #[test]
    fn test_empty_view_no_recommendations() {
        let table = view("Invoice,City,Dept,Amount\n");
        assert!(recommend(&table).is_empty());
    }

    #[test]
    fn test_close_the_gap_uplift() {
        let table = view(
            "Invoice,City,Dept,Amount\n\
             T1,Dubai,Dairy,900.0\n\
             T2,Sharjah,Dairy,100.0\n",
        );
        let recs = recommend(&table);
        let city_rec = recs.iter().find(|r| r.dimension == "City").unwrap();
        assert_eq!(city_rec.subject, "Sharjah");
        // Gap of 800 at the 0.5 conversion factor.
        assert_eq!(city_rec.expected_uplift, Some(400.0));
    }

    #[test]
    fn test_localized_department_opportunity() {
        // Toys is the weakest department overall (rank 5 of 5) but the
        // strongest inside Ajman (rank 1): a gap of 4 places.
        let table = view(
            "Invoice,City,Dept,Amount\n\
             T1,Dubai,Electronics,900.0\n\
             T2,Dubai,Dairy,800.0\n\
             T3,Dubai,Fashion,700.0\n\
             T4,Dubai,Grocery,600.0\n\
             T5,Ajman,Toys,50.0\n\
             T6,Ajman,Electronics,10.0\n",
        );
        let recs = recommend(&table);
        let localized = recs
            .iter()
            .find(|r| r.dimension == "Department" && r.subject == "Toys in Ajman")
            .unwrap();
        assert!(localized.observation.contains("#1 in Ajman"));
        assert!(localized.observation.contains("#5 company-wide"));
    }

    #[test]
    fn test_campaign_expansion() {
        // Summer rates three stars in Dubai but never ran in Sharjah.
        let table = view(
            "Invoice,City,Dept,Amount,Campaign\n\
             T1,Dubai,Dairy,900.0,Summer\n\
             T2,Dubai,Dairy,100.0,Winter\n\
             T3,Dubai,Dairy,110.0,Eid\n\
             T4,Dubai,Dairy,120.0,Ramadan\n\
             T5,Sharjah,Dairy,200.0,Winter\n",
        );
        let recs = recommend(&table);
        let expansion = recs
            .iter()
            .find(|r| r.dimension == "Campaign" && r.subject == "Summer")
            .unwrap();
        assert!(expansion.action.contains("Sharjah"));
        assert_eq!(expansion.expected_uplift, Some(450.0));
    }

    #[test]
    fn test_persona_targets_modal_profile() {
        let table = view(
            "Invoice,City,Dept,Amount,Age,Gender,Nationality,Store Format\n\
             T1,Dubai,Dairy,100.0,30,Female,Indian,Hypermarket\n\
             T2,Dubai,Dairy,150.0,32,Female,Indian,Hypermarket\n\
             T3,Dubai,Electronics,900.0,60,Male,Emirati,Express\n",
        );
        let recs = recommend(&table);
        let persona = recs.iter().find(|r| r.dimension == "Persona").unwrap();
        assert_eq!(persona.subject, "25-34 / Indian / Female");
        assert!(persona.action.contains("Dairy"));
        assert!(persona.action.contains("Hypermarket"));
        assert_eq!(persona.expected_uplift, None);
    }

    #[test]
    fn test_recommendations_deterministic() {
        let csv = "Invoice,City,Dept,Amount,Campaign\n\
                   T1,Dubai,Dairy,900.0,Summer\n\
                   T2,Sharjah,Electronics,100.0,Winter\n\
                   T3,Ajman,Fashion,500.0,Summer\n";
        let a = recommend(&view(csv));
        let b = recommend(&view(csv));
        assert_eq!(a, b);
    }
}
