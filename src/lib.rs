//! PO Ledger Library
//!
//! Financial core for purchase-order line items: landing-rate arithmetic,
//! order totals, list filtering, pagination and tabular export.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod common;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use common::DateRange;
pub use errors::{LedgerError, LedgerResult};
pub use models::{LineItem, LineItemStatus, Order, OrderItemView, OrderStatus, Platform};
pub use services::aggregation::{aggregate, OrderSummary, Totals};
pub use services::export::{Column, ExportRow, Exportable, TabularExporter};
pub use services::filtering::{FilterCriteria, Filterable};
pub use services::pagination::{Page, Paginator};

/// Parses a JSON array of orders as returned by the backend's order listing.
///
/// Only text that is not JSON, or a top-level value that is not an array, is an
/// error. Array elements that cannot be read as an order are skipped.
pub fn orders_from_json(json: &str) -> LedgerResult<Vec<Order>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_array() {
        return Err(LedgerError::InvalidInput(
            "expected a JSON array of orders".to_string(),
        ));
    }
    Ok(models::numeric::records_from_value(value))
}
