//! CSV ingestion and schema normalization
//!
//! Turns a raw CSV with free-form headers into a `NormalizedTable` of typed
//! transaction records. Rows that fail validation (non-positive amount,
//! zero quantity, out-of-range age) are skipped and tallied — they never
//! fail the pipeline. Only an unresolvable required column aborts.

use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::{ColumnMap, Field};
use crate::Result;

/// Age bracket for demographic grouping. Label order matches the brackets
/// used by downstream cross-tabs ("13-17" through "65+").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeGroup {
    Teens,
    YoungAdult,
    Adult,
    MidAge,
    Mature,
    Senior,
    Elder,
    Unknown,
}

impl AgeGroup {
    pub fn from_age(age: u8) -> AgeGroup {
        match age {
            13..=17 => AgeGroup::Teens,
            18..=24 => AgeGroup::YoungAdult,
            25..=34 => AgeGroup::Adult,
            35..=44 => AgeGroup::MidAge,
            45..=54 => AgeGroup::Mature,
            55..=64 => AgeGroup::Senior,
            _ => AgeGroup::Elder,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Teens => "13-17",
            AgeGroup::YoungAdult => "18-24",
            AgeGroup::Adult => "25-34",
            AgeGroup::MidAge => "35-44",
            AgeGroup::Mature => "45-54",
            AgeGroup::Senior => "55-64",
            AgeGroup::Elder => "65+",
            AgeGroup::Unknown => "Unknown",
        }
    }
}

/// One normalized sale line.
///
/// Invariants: `amount > 0`, `quantity >= 1`, `age` (when present) within
/// 13..=100. Text dimensions are never empty — missing values become
/// "Unknown" so grouping stays total.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: Option<NaiveDate>,
    pub city: String,
    pub zone: String,
    pub store_format: String,
    pub department: String,
    pub category: String,
    pub product: String,
    pub campaign: String,
    pub channel: String,
    pub promo_code: Option<String>,
    pub promo_used: bool,
    pub amount: f64,
    pub quantity: u32,
    pub gender: String,
    pub age: Option<u8>,
    pub age_group: AgeGroup,
    pub nationality: String,
    pub customer_type: String,
}

/// Per-reason counts of rows excluded during normalization.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SkipStats {
    /// Amount missing, unparseable, or <= 0.
    pub bad_amount: usize,
    /// Quantity parsed to 0 (unparseable quantities default to 1 instead).
    pub bad_quantity: usize,
    /// Age present but outside 13..=100.
    pub bad_age: usize,
}

impl SkipStats {
    pub fn total(&self) -> usize {
        self.bad_amount + self.bad_quantity + self.bad_age
    }
}

/// The immutable normalized source table all derived stages read from.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub rows: Vec<Transaction>,
    pub skipped: SkipStats,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loads and normalizes a CSV file.
pub fn load_normalized<P: AsRef<Path>>(path: P) -> Result<NormalizedTable> {
    let file = std::fs::File::open(path)?;
    load_normalized_from(file)
}

/// Loads and normalizes a CSV from any reader.
///
/// Resolves the alias table against the header row once, then coerces each
/// record into a `Transaction`, applying row validation.
pub fn load_normalized_from<R: Read>(reader: R) -> Result<NormalizedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let header_strs: Vec<&str> = headers.iter().collect();
    let map = ColumnMap::resolve(&header_strs)?;

    let mut rows = Vec::new();
    let mut skipped = SkipStats::default();

    for (row_idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        match normalize_record(&map, &record, row_idx) {
            RowOutcome::Keep(tx) => rows.push(*tx),
            RowOutcome::SkipAmount => skipped.bad_amount += 1,
            RowOutcome::SkipQuantity => skipped.bad_quantity += 1,
            RowOutcome::SkipAge => skipped.bad_age += 1,
        }
    }

    Ok(NormalizedTable { rows, skipped })
}

enum RowOutcome {
    Keep(Box<Transaction>),
    SkipAmount,
    SkipQuantity,
    SkipAge,
}

fn normalize_record(map: &ColumnMap, record: &csv::StringRecord, row_idx: usize) -> RowOutcome {
    // Amount is a required column; a row without a positive numeric amount
    // carries no signal for any metric.
    let amount = match map.value(Field::Amount, record).and_then(parse_number) {
        Some(a) if a > 0.0 => a,
        _ => return RowOutcome::SkipAmount,
    };

    // Quantity defaults to 1 when the column is unbound or the cell is
    // unparseable; an explicit 0 is a validation skip.
    let quantity = match map.value(Field::Quantity, record) {
        Some(raw) => match parse_number(raw) {
            Some(q) if q >= 1.0 => q as u32,
            Some(_) => return RowOutcome::SkipQuantity,
            None => 1,
        },
        None => 1,
    };

    // Age outside the sane range invalidates the row; an absent age only
    // degrades the demographic grouping to Unknown.
    let age = match map.value(Field::Age, record) {
        Some(raw) => match parse_number(raw) {
            Some(a) if (13.0..=100.0).contains(&a) => Some(a as u8),
            Some(_) => return RowOutcome::SkipAge,
            None => None,
        },
        None => None,
    };
    let age_group = age.map(AgeGroup::from_age).unwrap_or(AgeGroup::Unknown);

    let promo_code = map.value(Field::Promo, record).map(str::to_string);
    let promo_used = promo_code
        .as_deref()
        .is_some_and(|p| !p.eq_ignore_ascii_case("none") && !p.eq_ignore_ascii_case("nan"));

    let transaction_id = map
        .value(Field::Transaction, record)
        .map(str::to_string)
        .unwrap_or_else(|| row_idx.to_string());

    let date = map.value(Field::Date, record).and_then(parse_date);

    RowOutcome::Keep(Box::new(Transaction {
        transaction_id,
        date,
        city: text_or_unknown(map, Field::City, record),
        zone: text_or_unknown(map, Field::Zone, record),
        store_format: text_or_unknown(map, Field::StoreFormat, record),
        department: text_or_unknown(map, Field::Department, record),
        category: text_or_unknown(map, Field::Category, record),
        product: text_or_unknown(map, Field::Product, record),
        campaign: text_or_unknown(map, Field::Campaign, record),
        channel: text_or_unknown(map, Field::Channel, record),
        promo_code,
        promo_used,
        amount,
        quantity,
        gender: text_or_unknown(map, Field::Gender, record),
        age,
        age_group,
        nationality: text_or_unknown(map, Field::Nationality, record),
        customer_type: text_or_unknown(map, Field::CustomerType, record),
    }))
}

fn text_or_unknown(map: &ColumnMap, field: Field, record: &csv::StringRecord) -> String {
    map.value(field, record)
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Parses a numeric cell, tolerating thousands separators and currency
/// prefixes ("AED 1,250.00" → 1250.0).
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Accepted date layouts, tried in order. Datetime cells fall back to
/// their date component.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Serializes transactions back to a flat CSV in the canonical column
/// shape (the export counterpart of ingestion).
pub fn write_filtered_csv<W: Write>(rows: &[Transaction], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "transaction",
        "date",
        "city",
        "zone",
        "store_format",
        "department",
        "category",
        "product",
        "campaign",
        "channel",
        "promo_code",
        "amount",
        "quantity",
        "gender",
        "age",
        "nationality",
        "customer_type",
    ])?;

    for tx in rows {
        let date = tx.date.map(|d| d.to_string()).unwrap_or_default();
        let amount = tx.amount.to_string();
        let quantity = tx.quantity.to_string();
        let age = tx.age.map(|a| a.to_string()).unwrap_or_default();
        wtr.write_record([
            tx.transaction_id.as_str(),
            date.as_str(),
            tx.city.as_str(),
            tx.zone.as_str(),
            tx.store_format.as_str(),
            tx.department.as_str(),
            tx.category.as_str(),
            tx.product.as_str(),
            tx.campaign.as_str(),
            tx.channel.as_str(),
            tx.promo_code.as_deref().unwrap_or(""),
            amount.as_str(),
            quantity.as_str(),
            tx.gender.as_str(),
            age.as_str(),
            tx.nationality.as_str(),
            tx.customer_type.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
Invoice,Date,City,Store_Format,Dept,Sales_Value,Qty,Age,Gender,Nationality,Campaign
T1,2024-03-01,Dubai,Hypermarket,Dairy,100.0,10,34,Female,Indian,Ramadan Fest
T2,2024-03-02,Dubai,Express,Electronics,900.0,2,52,Male,Emirati,Mega Sale
T3,2024-03-03,Abu Dhabi,Hypermarket,Dairy,250.0,5,28,Female,Filipino,Ramadan Fest
";

    fn load(sample: &str) -> NormalizedTable {
        load_normalized_from(Cursor::new(sample)).unwrap()
    }

    #[test]
    fn test_aliased_amount_column_normalizes() {
        let table = load(SAMPLE);
        assert_eq!(table.len(), 3);
        let amounts: Vec<f64> = table.rows.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![100.0, 900.0, 250.0]);
    }

    #[test]
    fn test_age_groups_derived() {
        let table = load(SAMPLE);
        assert_eq!(table.rows[0].age_group, AgeGroup::Adult);
        assert_eq!(table.rows[1].age_group, AgeGroup::Mature);
        assert_eq!(table.rows[0].age_group.label(), "25-34");
    }

    #[test]
    fn test_invalid_rows_skipped_not_fatal() {
        let sample = "\
Invoice,City,Dept,Amount,Qty,Age
T1,Dubai,Dairy,100.0,2,30
T2,Dubai,Dairy,-5.0,2,30
T3,Dubai,Dairy,50.0,0,30
T4,Dubai,Dairy,50.0,2,200
T5,Dubai,Dairy,not_a_number,2,30
";
        let table = load(sample);
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped.bad_amount, 2);
        assert_eq!(table.skipped.bad_quantity, 1);
        assert_eq!(table.skipped.bad_age, 1);
        assert_eq!(table.skipped.total(), 4);
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let sample = "Invoice,City,Qty\nT1,Dubai,2\n";
        let err = load_normalized_from(Cursor::new(sample)).unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn test_missing_optional_columns_default() {
        let sample = "City,Dept,Amount\nDubai,Dairy,10.0\n";
        let table = load(sample);
        let tx = &table.rows[0];
        assert_eq!(tx.quantity, 1);
        assert_eq!(tx.transaction_id, "0");
        assert_eq!(tx.campaign, "Unknown");
        assert_eq!(tx.age_group, AgeGroup::Unknown);
        assert!(!tx.promo_used);
    }

    #[test]
    fn test_currency_and_separator_tolerant_parsing() {
        let sample = "City,Dept,Amount\nDubai,Dairy,\"AED 1,250.50\"\n";
        let table = load(sample);
        assert_eq!(table.rows[0].amount, 1250.50);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(
            parse_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date("2024-03-01T08:26:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date("01/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_export_roundtrip_shape() {
        let table = load(SAMPLE);
        let mut out = Vec::new();
        write_filtered_csv(&table.rows, &mut out).unwrap();

        let reloaded = load_normalized_from(Cursor::new(out)).unwrap();
        assert_eq!(reloaded.len(), table.len());
        assert_eq!(reloaded.rows[0].city, "Dubai");
        assert_eq!(reloaded.rows[0].amount, 100.0);
    }
}
