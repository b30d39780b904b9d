//! Tabular export of ledger records.
//!
//! Records are mapped to [`ExportRow`]s: ordered `(label, text)` pairs that
//! follow the column order exactly. Cell text is produced by the column's
//! formatter, which defaults to a per-type rule (currency, percent, date,
//! plain). Rows stay in memory; [`write_delimited`] encodes them as CSV/TSV.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::aggregation::OrderSummary;
use super::rates::{round_currency, round_volume, CURRENCY_DECIMAL_PLACES};
use crate::common::DATE_FORMAT;
use crate::config::AppConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{LineItem, OrderItemView};

pub const DEFAULT_PLACEHOLDER: &str = "N/A";
pub const DEFAULT_PERCENT_DECIMALS: u32 = 2;

/// Keys never offered as dynamic columns.
pub const EXCLUDED_KEYS: [&str; 4] = ["id", "po_id", "created_at", "updated_at"];

/// Column priority for dynamically discovered line-item columns. Keys not
/// listed here follow in alphabetical order.
pub const PREFERRED_ITEM_KEYS: &[&str] = &[
    "s_no",
    "item_name",
    "hsn_code",
    "sap_code",
    "sku_code",
    "description",
    "ean_upc_code",
    "case_quantity",
    "quantity",
    "basic_rate",
    "basic_cost",
    "mrp",
    "tax_rate_percent",
    "landing_rate",
    "landing_cost",
    "sgst_percent",
    "sgst_amount",
    "cgst_percent",
    "cgst_amount",
    "igst_percent",
    "igst_amount",
    "gst_percent",
    "gst_amount",
    "cess_percent",
    "cess_value",
    "state_cess_percent",
    "state_cess",
    "line_total",
    "total_value",
];

/// A typed cell value before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Currency(Decimal),
    Percent(Decimal),
    Date(NaiveDate),
    Integer(i128),
    Decimal(Decimal),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// `Text` for a present string, `Missing` otherwise.
    pub fn optional_text(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |s| Self::Text(s.to_string()))
    }

    pub fn optional_date(value: Option<NaiveDate>) -> Self {
        value.map_or(Self::Missing, Self::Date)
    }

    pub fn optional_currency(value: Option<Decimal>) -> Self {
        value.map_or(Self::Missing, Self::Currency)
    }

    /// Blank text counts as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Options shared by every default formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub placeholder: String,
    /// 1 or 2; other values are clamped into that range.
    pub percent_decimals: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            percent_decimals: DEFAULT_PERCENT_DECIMALS,
        }
    }
}

impl From<&AppConfig> for ExportOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            placeholder: config.export_placeholder.clone(),
            percent_decimals: config.percent_decimals,
        }
    }
}

impl ExportOptions {
    /// Renders a cell with the type-driven default rule.
    pub fn format(&self, value: &CellValue) -> String {
        if value.is_missing() {
            return self.placeholder.clone();
        }
        match value {
            CellValue::Currency(amount) => fixed(round_currency(*amount), CURRENCY_DECIMAL_PLACES),
            CellValue::Percent(rate) => {
                let places = self.percent_decimals.clamp(1, 2);
                let rounded =
                    rate.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
                format!("{}%", fixed(rounded, places))
            }
            CellValue::Date(day) => day.format(DATE_FORMAT).to_string(),
            CellValue::Integer(n) => n.to_string(),
            CellValue::Decimal(d) => d.normalize().to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Missing => self.placeholder.clone(),
        }
    }
}

fn fixed(mut value: Decimal, places: u32) -> String {
    value.rescale(places);
    value.to_string()
}

pub type FormatFn = dyn Fn(&CellValue, &ExportOptions) -> String + Send + Sync;

/// How a column turns a [`CellValue`] into text.
#[derive(Clone, Default)]
pub enum Formatter {
    #[default]
    Default,
    Custom(Arc<FormatFn>),
}

impl Formatter {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&CellValue, &ExportOptions) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Default formatting, but with a column-specific text for missing values.
    pub fn missing_as(text: &'static str) -> Self {
        Self::custom(move |value, options| {
            if value.is_missing() {
                text.to_string()
            } else {
                options.format(value)
            }
        })
    }

    pub fn apply(&self, value: &CellValue, options: &ExportOptions) -> String {
        match self {
            Self::Default => options.format(value),
            Self::Custom(f) => f(value, options),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub formatter: Formatter,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            formatter: Formatter::Default,
        }
    }

    /// Column labelled by [`humanize_key`].
    pub fn from_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let label = humanize_key(&key);
        Self::new(key, label)
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }
}

/// One exported record: `(label, text)` pairs in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRow {
    cells: Vec<(String, String)>,
}

impl ExportRow {
    pub fn push(&mut self, label: impl Into<String>, text: impl Into<String>) {
        self.cells.push((label.into(), text.into()));
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, text)| text.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(label, _)| label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ExportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (label, text) in &self.cells {
            map.serialize_entry(label, text)?;
        }
        map.end()
    }
}

/// A record that can be exported.
///
/// `cell` resolves a column key to a typed value, returning
/// [`CellValue::Missing`] for keys the record does not carry. `field_keys`
/// lists the keys the record actually has, for dynamic column discovery.
pub trait Exportable {
    fn cell(&self, key: &str) -> CellValue;
    fn field_keys(&self) -> Vec<String>;
}

impl<T: Exportable + ?Sized> Exportable for &T {
    fn cell(&self, key: &str) -> CellValue {
        (**self).cell(key)
    }

    fn field_keys(&self) -> Vec<String> {
        (**self).field_keys()
    }
}

/// Free-form platform fields. Numbers (and numeric strings) are typed by key
/// suffix: `_percent` as a percentage, cost-like keys as currency.
impl Exportable for BTreeMap<String, Value> {
    fn cell(&self, key: &str) -> CellValue {
        self.get(key).map_or(CellValue::Missing, |value| value_cell(key, value))
    }

    fn field_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

fn value_cell(key: &str, value: &Value) -> CellValue {
    let numeric = match value {
        Value::Null => return CellValue::Missing,
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Bool(b) => return CellValue::Text(b.to_string()),
        other => return CellValue::Text(other.to_string()),
    };
    match numeric {
        Some(d) if key.ends_with("_percent") => CellValue::Percent(d),
        Some(d) if is_currency_key(key) => CellValue::Currency(d),
        _ => match value {
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        },
    }
}

fn is_currency_key(key: &str) -> bool {
    key == "mrp"
        || key == "state_cess"
        || ["_amount", "_cost", "_value", "_rate", "_total"]
            .iter()
            .any(|suffix| key.ends_with(suffix))
}

impl Exportable for LineItem {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "id" => self.id.map_or(CellValue::Missing, |id| CellValue::Integer(id.into())),
            "item_name" => CellValue::text(self.item_name.as_str()),
            "sap_code" => CellValue::optional_text(self.sap_code.as_deref()),
            "hsn_code" => CellValue::optional_text(self.hsn_code.as_deref()),
            "category" => CellValue::optional_text(self.category.as_deref()),
            "subcategory" => CellValue::optional_text(self.subcategory.as_deref()),
            "quantity" => CellValue::Integer(self.quantity.into()),
            "basic_rate" => CellValue::Currency(self.basic_rate),
            "tax_rate_percent" | "gst_rate" => CellValue::Percent(self.tax_rate_percent),
            "tax_amount" | "gst_amount" => CellValue::Currency(self.tax_contribution()),
            "total_litres" => self
                .total_litres
                .map_or(CellValue::Missing, |l| CellValue::Decimal(round_volume(l))),
            "landing_rate" => CellValue::Currency(self.landing_rate()),
            "line_total" | "item_total" => CellValue::Currency(self.line_total()),
            "status" => CellValue::Text(self.status.to_string()),
            other => self.extra.cell(other),
        }
    }

    fn field_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [
            "item_name",
            "quantity",
            "basic_rate",
            "tax_rate_percent",
            "landing_rate",
            "line_total",
            "status",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        let optional = [
            ("id", self.id.is_some()),
            ("sap_code", self.sap_code.is_some()),
            ("hsn_code", self.hsn_code.is_some()),
            ("category", self.category.is_some()),
            ("subcategory", self.subcategory.is_some()),
            ("tax_amount", self.tax_amount.is_some()),
            ("total_litres", self.total_litres.is_some()),
        ];
        keys.extend(
            optional
                .iter()
                .filter(|(_, present)| *present)
                .map(|(key, _)| key.to_string()),
        );
        keys.extend(self.extra.field_keys());
        keys
    }
}

const VIEW_KEYS: [&str; 5] = ["po_number", "platform", "order_date", "expiry_date", "order_status"];

impl Exportable for OrderItemView<'_> {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "po_number" => CellValue::text(self.po_number()),
            "platform" | "platform_name" => CellValue::optional_text(self.platform_name()),
            "order_date" => CellValue::optional_date(self.order.order_day()),
            "expiry_date" => CellValue::optional_date(self.order.expiry_day()),
            "order_status" => CellValue::Text(self.order.status.to_string()),
            other => self.item.cell(other),
        }
    }

    fn field_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = VIEW_KEYS.iter().map(|k| k.to_string()).collect();
        keys.extend(self.item.field_keys());
        keys
    }
}

const SUMMARY_KEYS: [&str; 12] = [
    "po_number",
    "platform",
    "status",
    "order_date",
    "expiry_date",
    "serving_distributor",
    "item_count",
    "total_quantity",
    "total_basic_cost",
    "total_tax",
    "grand_total",
    "total_litres",
];

impl Exportable for OrderSummary {
    fn cell(&self, key: &str) -> CellValue {
        match key {
            "po_number" => CellValue::text(self.po_number.as_str()),
            "platform" => CellValue::optional_text(self.platform.as_deref()),
            "status" => CellValue::Text(self.status.to_string()),
            "order_date" => CellValue::optional_date(self.order_date),
            "expiry_date" => CellValue::optional_date(self.expiry_date),
            "serving_distributor" => CellValue::optional_text(self.serving_distributor.as_deref()),
            "item_count" => CellValue::Integer(self.totals.item_count as i128),
            "total_quantity" => CellValue::Integer(self.totals.total_quantity.into()),
            "total_basic_cost" => CellValue::Currency(self.totals.total_basic_cost),
            "total_tax" => CellValue::Currency(self.totals.total_tax),
            "grand_total" => CellValue::Currency(self.totals.grand_total),
            "total_litres" => CellValue::Decimal(self.totals.total_litres),
            _ => CellValue::Missing,
        }
    }

    fn field_keys(&self) -> Vec<String> {
        SUMMARY_KEYS.iter().map(|k| k.to_string()).collect()
    }
}

/// `"hsn_code"` → `"Hsn Code"`.
pub fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Columns for the union of keys across `records`: `preferred` keys first, in
/// that order, then the rest alphabetically. `excluded` keys are dropped.
pub fn discover_columns<R: Exportable>(
    records: &[R],
    preferred: &[&str],
    excluded: &[&str],
) -> Vec<Column> {
    let present: BTreeSet<String> = records
        .iter()
        .flat_map(|record| record.field_keys())
        .filter(|key| !excluded.contains(&key.as_str()))
        .collect();

    let mut columns: Vec<Column> = preferred
        .iter()
        .filter(|key| present.contains(**key))
        .map(|key| Column::from_key(*key))
        .collect();
    columns.extend(
        present
            .iter()
            .filter(|key| !preferred.contains(&key.as_str()))
            .map(|key| Column::from_key(key.as_str())),
    );
    columns
}

/// Dynamic line-item columns with the platform priority order.
pub fn discover_item_columns<R: Exportable>(records: &[R]) -> Vec<Column> {
    discover_columns(records, PREFERRED_ITEM_KEYS, &EXCLUDED_KEYS)
}

fn upper_status() -> Formatter {
    Formatter::custom(|value, options| options.format(value).to_uppercase())
}

/// The "Order Items" sheet, one row per [`OrderItemView`].
pub fn order_item_columns() -> Vec<Column> {
    vec![
        Column::new("po_number", "PO Number"),
        Column::new("platform", "Platform"),
        Column::new("item_name", "Item Name"),
        Column::new("sap_code", "SAP Code"),
        Column::new("hsn_code", "HSN Code"),
        Column::new("quantity", "Quantity"),
        Column::new("basic_rate", "Basic Rate"),
        Column::new("tax_rate_percent", "GST Rate"),
        Column::new("landing_rate", "Landing Rate"),
        Column::new("line_total", "Item Total"),
        Column::new("status", "Status").with_formatter(upper_status()),
        Column::new("order_date", "Order Date"),
        Column::new("expiry_date", "Expiry Date").with_formatter(Formatter::missing_as("Not set")),
    ]
}

/// The "PO Summary" sheet, one row per [`OrderSummary`].
pub fn order_summary_columns() -> Vec<Column> {
    vec![
        Column::new("po_number", "PO Number"),
        Column::new("platform", "Platform"),
        Column::new("status", "Status"),
        Column::new("order_date", "Order Date").with_formatter(Formatter::missing_as("Not set")),
        Column::new("expiry_date", "Expiry Date").with_formatter(Formatter::missing_as("Not set")),
        Column::new("serving_distributor", "Distributor")
            .with_formatter(Formatter::missing_as("Not assigned")),
        Column::new("item_count", "Total Items"),
        Column::new("total_quantity", "Total Quantity"),
        Column::new("total_basic_cost", "Total Basic Cost"),
        Column::new("total_tax", "Total Tax"),
        Column::new("grand_total", "Total Value"),
    ]
}

/// Maps records to rows under a fixed set of [`ExportOptions`].
#[derive(Debug, Clone, Default)]
pub struct TabularExporter {
    options: ExportOptions,
}

impl TabularExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn format_cell(&self, column: &Column, value: &CellValue) -> String {
        column.formatter.apply(value, &self.options)
    }

    pub fn to_row<R: Exportable + ?Sized>(&self, record: &R, columns: &[Column]) -> ExportRow {
        let mut row = ExportRow {
            cells: Vec::with_capacity(columns.len()),
        };
        for column in columns {
            let value = record.cell(&column.key);
            row.push(column.label.as_str(), self.format_cell(column, &value));
        }
        row
    }

    #[instrument(skip_all, fields(records = records.len(), columns = columns.len()))]
    pub fn to_rows<R: Exportable>(&self, records: &[R], columns: &[Column]) -> Vec<ExportRow> {
        let rows: Vec<ExportRow> = records
            .iter()
            .map(|record| self.to_row(record, columns))
            .collect();
        debug!(rows = rows.len(), "built export rows");
        rows
    }
}

/// [`TabularExporter::to_rows`] with default options.
pub fn to_rows<R: Exportable>(records: &[R], columns: &[Column]) -> Vec<ExportRow> {
    TabularExporter::default().to_rows(records, columns)
}

/// Writes `rows` as delimited text with a header line taken from the first
/// row's labels. Writes nothing for an empty slice. Returns the number of data
/// rows written.
#[instrument(skip(rows, writer), fields(rows = rows.len()))]
pub fn write_delimited<W: Write>(rows: &[ExportRow], delimiter: u8, writer: W) -> LedgerResult<usize> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    if delimiter == b'"' || delimiter == b'\n' || delimiter == b'\r' {
        return Err(LedgerError::InvalidInput(format!(
            "unusable delimiter {:?}",
            delimiter as char
        )));
    }

    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    out.write_record(first.labels())?;
    for row in rows {
        out.write_record(row.values())?;
    }
    out.flush()?;
    debug!(rows = rows.len(), "wrote delimited export");
    Ok(rows.len())
}
