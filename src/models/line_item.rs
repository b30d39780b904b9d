use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;

use super::numeric::{
    clamp_non_negative, lenient_decimal, lenient_optional_decimal, lenient_optional_id,
    lenient_optional_string, lenient_quantity, lenient_string,
};
use super::status_key;
use crate::errors::LedgerError;
use crate::services::rates;

/// Keys that are always derived from other fields and therefore never kept in
/// the free-form `extra` map, even when a feed sends them.
pub const DERIVED_KEYS: [&str; 4] = ["landing_rate", "line_total", "item_total", "amount"];

/// Per-line fulfilment status.
///
/// The set is flat: any status may be replaced by any other through an explicit
/// user action, so no transition rules are enforced here.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter, strum::Display,
)]
pub enum LineItemStatus {
    #[default]
    #[strum(to_string = "Pending")]
    Pending,
    #[strum(to_string = "Invoiced")]
    Invoiced,
    #[strum(to_string = "Dispatched")]
    Dispatched,
    #[strum(to_string = "Delivered")]
    Delivered,
    #[strum(to_string = "Cancelled")]
    Cancelled,
    #[strum(to_string = "Expired")]
    Expired,
    #[strum(to_string = "Hold")]
    Hold,
    #[strum(to_string = "Price Difference")]
    PriceDifference,
    #[strum(to_string = "MOV Issue")]
    MovIssue,
    #[strum(to_string = "Stock Issue")]
    StockIssue,
    #[strum(to_string = "CN")]
    CN,
    #[strum(to_string = "RTV")]
    RTV,
}

impl LineItemStatus {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::PriceDifference => &["price diff", "pricediff"],
            Self::Cancelled => &["canceled"],
            Self::CN => &["credit note"],
            Self::RTV => &["return to vendor"],
            _ => &[],
        }
    }

    /// Lenient lookup used while reading backend records.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key = status_key(raw);
        if key.is_empty() {
            return None;
        }
        Self::iter().find(|status| {
            status_key(&status.to_string()) == key
                || status.aliases().iter().any(|alias| status_key(alias) == key)
        })
    }
}

impl FromStr for LineItemStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| LedgerError::InvalidStatus(s.to_string()))
    }
}

impl Serialize for LineItemStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LineItemStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .and_then(Self::parse_lenient)
            .unwrap_or_default())
    }
}

/// One purchase-order line.
///
/// `landing_rate` and `line_total` are not stored; they are recomputed from
/// `basic_rate`, `tax_rate_percent` and `quantity` on every call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineItemRecord")]
pub struct LineItem {
    /// Backend identifier, when the line has been persisted.
    pub id: Option<i64>,
    pub item_name: String,
    /// SAP / SKU code.
    pub sap_code: Option<String>,
    /// HSN tax-classification code.
    pub hsn_code: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub quantity: u64,
    /// Pre-tax unit price.
    pub basic_rate: Decimal,
    /// Tax rate in percent (18 means 18%).
    pub tax_rate_percent: Decimal,
    /// Tax amount stated by the source feed, preferred over the derived one.
    pub tax_amount: Option<Decimal>,
    pub total_litres: Option<Decimal>,
    pub status: LineItemStatus,
    /// Platform-specific fields that have no typed counterpart.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Wire shape of a line item as sent by the backend.
#[derive(Deserialize)]
struct LineItemRecord {
    #[serde(default, deserialize_with = "lenient_optional_id")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    item_name: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    sap_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    hsn_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    subcategory: Option<String>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: u64,
    #[serde(default, deserialize_with = "lenient_decimal")]
    basic_rate: Decimal,
    #[serde(default, alias = "gst_rate", deserialize_with = "lenient_decimal")]
    tax_rate_percent: Decimal,
    #[serde(default, alias = "gst_amount", deserialize_with = "lenient_optional_decimal")]
    tax_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    total_litres: Option<Decimal>,
    #[serde(default)]
    status: LineItemStatus,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl From<LineItemRecord> for LineItem {
    fn from(record: LineItemRecord) -> Self {
        let mut extra = record.extra;
        extra.retain(|key, _| !DERIVED_KEYS.contains(&key.as_str()));
        Self {
            id: record.id,
            item_name: record.item_name,
            sap_code: record.sap_code,
            hsn_code: record.hsn_code,
            category: record.category,
            subcategory: record.subcategory,
            quantity: record.quantity,
            basic_rate: record.basic_rate,
            tax_rate_percent: record.tax_rate_percent,
            tax_amount: record.tax_amount.map(clamp_non_negative),
            total_litres: record.total_litres,
            status: record.status,
            extra,
        }
    }
}

impl LineItem {
    /// Creates a pending line with the given pricing inputs.
    pub fn new(
        item_name: impl Into<String>,
        quantity: u64,
        basic_rate: Decimal,
        tax_rate_percent: Decimal,
    ) -> Self {
        Self {
            id: None,
            item_name: item_name.into(),
            sap_code: None,
            hsn_code: None,
            category: None,
            subcategory: None,
            quantity,
            basic_rate: clamp_non_negative(basic_rate),
            tax_rate_percent: clamp_non_negative(tax_rate_percent),
            tax_amount: None,
            total_litres: None,
            status: LineItemStatus::Pending,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_codes(mut self, sap_code: impl Into<String>, hsn_code: impl Into<String>) -> Self {
        self.sap_code = Some(sap_code.into());
        self.hsn_code = Some(hsn_code.into());
        self
    }

    pub fn with_status(mut self, status: LineItemStatus) -> Self {
        self.status = status;
        self
    }

    /// Tax-inclusive unit price, rounded to 2 decimals.
    pub fn landing_rate(&self) -> Decimal {
        rates::compute_landing_rate(self.basic_rate, self.tax_rate_percent)
    }

    /// `landing_rate * quantity`, rounded to 2 decimals.
    pub fn line_total(&self) -> Decimal {
        rates::compute_line_total(self.landing_rate(), self.quantity)
    }

    /// Unrounded pre-tax extended cost.
    pub fn basic_cost(&self) -> Decimal {
        rates::saturating_mul(
            clamp_non_negative(self.basic_rate),
            Decimal::from(self.quantity),
        )
    }

    /// Tax contribution of this line: the explicit amount when the feed carries
    /// one, otherwise `line_total - basic_cost`. Unrounded.
    pub fn tax_contribution(&self) -> Decimal {
        match self.tax_amount {
            Some(amount) => amount,
            None => rates::line_tax(self.basic_rate, self.tax_rate_percent, self.quantity),
        }
    }

    pub fn update_status(&mut self, new_status: LineItemStatus) {
        self.status = new_status;
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} @ {} ({})",
            self.item_name,
            self.quantity,
            self.landing_rate(),
            self.status
        )
    }
}

/// Applies `status` to every line whose id is in `ids`, returning the number of
/// lines updated. Lines without an id are never touched.
pub fn apply_bulk_status(items: &mut [LineItem], ids: &[i64], status: LineItemStatus) -> usize {
    let mut updated = 0;
    for item in items.iter_mut() {
        if item.id.is_some_and(|id| ids.contains(&id)) {
            item.update_status(status);
            updated += 1;
        }
    }
    tracing::debug!(requested = ids.len(), updated, %status, "bulk status applied");
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("Pending", LineItemStatus::Pending)]
    #[case("INVOICED", LineItemStatus::Invoiced)]
    #[case("price difference", LineItemStatus::PriceDifference)]
    #[case("PRICE_DIFF", LineItemStatus::PriceDifference)]
    #[case("PriceDifference", LineItemStatus::PriceDifference)]
    #[case("mov issue", LineItemStatus::MovIssue)]
    #[case("STOCK_ISSUE", LineItemStatus::StockIssue)]
    #[case("cn", LineItemStatus::CN)]
    #[case("Rtv", LineItemStatus::RTV)]
    fn parses_status_variants(#[case] raw: &str, #[case] expected: LineItemStatus) {
        assert_eq!(raw.parse::<LineItemStatus>().unwrap(), expected);
    }

    #[test]
    fn unknown_status_is_an_error_when_parsed_strictly() {
        let err = "Teleported".parse::<LineItemStatus>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStatus(_)));
    }

    #[test]
    fn missing_or_unknown_status_defaults_to_pending_on_read() {
        let item: LineItem =
            serde_json::from_str(r#"{"item_name": "Ghee 1L", "status": null}"#).unwrap();
        assert_eq!(item.status, LineItemStatus::Pending);

        let item: LineItem =
            serde_json::from_str(r#"{"item_name": "Ghee 1L", "status": "???"}"#).unwrap();
        assert_eq!(item.status, LineItemStatus::Pending);
    }

    #[test]
    fn deserializes_backend_record() {
        let json = r#"{
            "id": 7,
            "po_id": 3,
            "item_name": "Cow Ghee 500ml",
            "sap_code": "FG1001",
            "hsn_code": "0405",
            "quantity": "12",
            "basic_rate": "450.00",
            "gst_rate": "12.00",
            "landing_rate": "999.99",
            "status": "DISPATCHED",
            "ean_upc_code": "8901234567890"
        }"#;
        let item: LineItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id, Some(7));
        assert_eq!(item.quantity, 12);
        assert_eq!(item.tax_rate_percent, dec!(12.00));
        assert_eq!(item.status, LineItemStatus::Dispatched);
        // Stale derived values from the feed are discarded and recomputed.
        assert!(!item.extra.contains_key("landing_rate"));
        assert_eq!(item.landing_rate(), dec!(504.00));
        assert!(item.extra.contains_key("ean_upc_code"));
        assert!(item.extra.contains_key("po_id"));
    }

    #[test]
    fn wrongly_typed_text_fields_do_not_reject_the_line() {
        let json = r#"{
            "id": "31",
            "item_name": null,
            "sap_code": 100245,
            "hsn_code": 4051000,
            "category": ["Dairy"],
            "quantity": 3,
            "basic_rate": "10",
            "gst_rate": 5
        }"#;
        let item: LineItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id, Some(31));
        assert_eq!(item.item_name, "");
        assert_eq!(item.sap_code.as_deref(), Some("100245"));
        assert_eq!(item.hsn_code.as_deref(), Some("4051000"));
        assert_eq!(item.category, None);
        assert_eq!(item.line_total(), dec!(31.50));
    }

    #[test]
    fn huge_rates_saturate() {
        let item = LineItem::new("Bulk", u64::MAX, Decimal::MAX, dec!(18));
        assert_eq!(item.landing_rate(), Decimal::MAX);
        assert_eq!(item.line_total(), Decimal::MAX);
        assert_eq!(item.basic_cost(), Decimal::MAX);
    }

    #[test]
    fn derived_fields_follow_inputs() {
        let mut item = LineItem::new("Paneer", 2, dec!(100), dec!(18));
        assert_eq!(item.landing_rate(), dec!(118.00));
        assert_eq!(item.line_total(), dec!(236.00));

        item.basic_rate = dec!(200);
        item.quantity = 3;
        assert_eq!(item.landing_rate(), dec!(236.00));
        assert_eq!(item.line_total(), dec!(708.00));
    }

    #[test]
    fn explicit_tax_amount_wins() {
        let mut item = LineItem::new("Butter", 1, dec!(100), dec!(18));
        assert_eq!(item.tax_contribution(), dec!(18));
        item.tax_amount = Some(dec!(17.50));
        assert_eq!(item.tax_contribution(), dec!(17.50));
    }

    #[test]
    fn bulk_status_only_touches_listed_ids() {
        let mut items = vec![
            LineItem::new("A", 1, dec!(10), dec!(0)).with_id(1),
            LineItem::new("B", 1, dec!(10), dec!(0)).with_id(2),
            LineItem::new("C", 1, dec!(10), dec!(0)),
        ];

        let updated = apply_bulk_status(&mut items, &[2, 99], LineItemStatus::Hold);

        assert_eq!(updated, 1);
        assert_eq!(items[0].status, LineItemStatus::Pending);
        assert_eq!(items[1].status, LineItemStatus::Hold);
        assert_eq!(items[2].status, LineItemStatus::Pending);
    }

    #[test]
    fn status_serializes_as_display_label() {
        let json = serde_json::to_string(&LineItemStatus::MovIssue).unwrap();
        assert_eq!(json, "\"MOV Issue\"");
    }
}
