//! Canonical schema and alias-based column resolution
//!
//! Source tables arrive with arbitrary column names ("Sales_Value",
//! "REVENUE", "dept", ...). Each canonical field declares an ordered list of
//! accepted aliases; resolution scans aliases in priority order and binds
//! the first input column whose lower-cased name contains the alias. The
//! lookup happens exactly once, at normalization time — everything
//! downstream works against the resolved `ColumnMap`.

use std::collections::HashMap;

use crate::error::InsightError;

/// The canonical fields of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Amount,
    Quantity,
    Department,
    StoreFormat,
    Category,
    Product,
    Campaign,
    Channel,
    Promo,
    Gender,
    Age,
    Nationality,
    City,
    Zone,
    Transaction,
    Date,
    CustomerType,
}

/// All canonical fields, in export column order.
pub const ALL_FIELDS: [Field; 17] = [
    Field::Transaction,
    Field::Date,
    Field::City,
    Field::Zone,
    Field::StoreFormat,
    Field::Department,
    Field::Category,
    Field::Product,
    Field::Campaign,
    Field::Channel,
    Field::Promo,
    Field::Amount,
    Field::Quantity,
    Field::Gender,
    Field::Age,
    Field::Nationality,
    Field::CustomerType,
];

impl Field {
    /// Canonical name used in error messages and exported headers.
    pub fn name(self) -> &'static str {
        match self {
            Field::Amount => "amount",
            Field::Quantity => "quantity",
            Field::Department => "department",
            Field::StoreFormat => "store_format",
            Field::Category => "category",
            Field::Product => "product",
            Field::Campaign => "campaign",
            Field::Channel => "channel",
            Field::Promo => "promo_code",
            Field::Gender => "gender",
            Field::Age => "age",
            Field::Nationality => "nationality",
            Field::City => "city",
            Field::Zone => "zone",
            Field::Transaction => "transaction",
            Field::Date => "date",
            Field::CustomerType => "customer_type",
        }
    }

    /// Accepted header aliases, highest priority first. Matching is a
    /// case-insensitive substring test against the input header.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Amount => &["amount", "sales", "revenue", "net", "total", "paid", "value"],
            Field::Quantity => &["qty", "quantity", "units"],
            Field::Department => &["department", "dept"],
            Field::StoreFormat => &[
                "store_format",
                "store format",
                "format",
                "storetype",
                "store_type",
            ],
            Field::Category => &["category", "cat", "sub_category", "subcat"],
            Field::Product => &["product", "sku", "item", "product_name", "brand"],
            Field::Campaign => &["campaign", "ad_campaign", "campaign_name"],
            Field::Channel => &["channel", "ad_channel", "media_channel"],
            Field::Promo => &["promo", "voucher", "coupon", "promo_code", "discount"],
            Field::Gender => &["gender"],
            Field::Age => &["age", "customer_age", "age_group"],
            Field::Nationality => &["national", "country", "nationality"],
            Field::City => &["city", "location"],
            Field::Zone => &["zone", "area", "district"],
            Field::Transaction => &["invoice", "transaction", "order", "receipt", "bill", "txn"],
            Field::Date => &["date", "transaction_date", "purchase_date"],
            Field::CustomerType => &["customer_type", "new_repeat", "customer_status"],
        }
    }

    /// Fields every engine stage consumes; normalization fails without them.
    pub fn required(self) -> bool {
        matches!(self, Field::Amount | Field::Department | Field::City)
    }
}

/// Resolved mapping from canonical fields to source column indices.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
}

impl ColumnMap {
    /// Resolves the alias table against the input headers. For each field,
    /// aliases are tried in priority order and columns left to right; the
    /// first match wins. A required field with no match is a schema error
    /// naming the canonical field.
    pub fn resolve(headers: &[&str]) -> Result<ColumnMap, InsightError> {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let mut indices = HashMap::new();

        for field in ALL_FIELDS {
            let found = field.aliases().iter().find_map(|alias| {
                lowered.iter().position(|col| col.contains(alias))
            });
            match found {
                Some(idx) => {
                    indices.insert(field, idx);
                }
                None if field.required() => {
                    return Err(InsightError::MissingColumn(field.name()));
                }
                None => {}
            }
        }

        Ok(ColumnMap { indices })
    }

    /// Source column index bound to `field`, if any alias matched.
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    /// Raw string value of `field` in a record, trimmed; `None` when the
    /// column is unbound or the cell is blank.
    pub fn value<'a>(&self, field: Field, record: &'a csv::StringRecord) -> Option<&'a str> {
        let idx = self.index_of(field)?;
        let raw = record.get(idx)?.trim();
        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_headers() {
        let headers = vec![
            "Transaction", "Date", "City", "Department", "Amount", "Quantity",
        ];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.index_of(Field::Transaction), Some(0));
        assert_eq!(map.index_of(Field::City), Some(2));
        assert_eq!(map.index_of(Field::Amount), Some(4));
        assert_eq!(map.index_of(Field::Quantity), Some(5));
    }

    #[test]
    fn test_resolve_aliased_headers() {
        // "Sales_Value" matches the "sales" alias, "Dept" matches "dept",
        // "Location" matches city's "location", "Invoice No" matches
        // transaction's "invoice".
        let headers = vec!["Invoice No", "Sales_Value", "Dept", "Location", "Units"];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.index_of(Field::Transaction), Some(0));
        assert_eq!(map.index_of(Field::Amount), Some(1));
        assert_eq!(map.index_of(Field::Department), Some(2));
        assert_eq!(map.index_of(Field::City), Some(3));
        assert_eq!(map.index_of(Field::Quantity), Some(4));
    }

    #[test]
    fn test_first_alias_wins() {
        // Both "Revenue" and "Total_Paid" could bind amount; "sales" has
        // higher priority than "revenue" so "Net_Sales" must win.
        let headers = vec!["Revenue", "Net_Sales", "Dept", "City"];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.index_of(Field::Amount), Some(1));
    }

    #[test]
    fn test_missing_required_column() {
        let headers = vec!["Date", "City", "Department", "Quantity"];
        let err = ColumnMap::resolve(&headers).unwrap_err();
        match err {
            InsightError::MissingColumn(name) => assert_eq!(name, "amount"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_optional_columns_unbound() {
        let headers = vec!["Amount", "City", "Department"];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.index_of(Field::Campaign), None);
        assert_eq!(map.index_of(Field::Age), None);
    }
}
