use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

use super::rates::{round_currency, round_volume, saturating_add};
use crate::models::numeric::clamp_non_negative;
use crate::models::{LineItem, LineItemStatus, Order, OrderStatus};

/// Order-level totals folded from a set of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub item_count: usize,
    pub total_quantity: u64,
    /// Σ basic_rate × quantity (tax excluded).
    pub total_basic_cost: Decimal,
    pub total_tax: Decimal,
    /// Σ line totals (tax included).
    pub grand_total: Decimal,
    pub total_litres: Decimal,
}

/// Folds line items into [`Totals`].
///
/// Terms are summed unrounded and each total is rounded once at the end, so
/// the result does not depend on how the collection is split or ordered.
#[instrument(skip_all)]
pub fn aggregate<'a, I>(items: I) -> Totals
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut item_count = 0usize;
    let mut total_quantity = 0u64;
    let mut basic = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    let mut grand = Decimal::ZERO;
    let mut litres = Decimal::ZERO;

    for item in items {
        item_count += 1;
        total_quantity = total_quantity.saturating_add(item.quantity);
        basic = saturating_add(basic, item.basic_cost());
        tax = saturating_add(tax, item.tax_contribution());
        grand = saturating_add(grand, item.line_total());
        litres = saturating_add(
            litres,
            item.total_litres.map(clamp_non_negative).unwrap_or_default(),
        );
    }

    let totals = Totals {
        item_count,
        total_quantity,
        total_basic_cost: round_currency(basic),
        total_tax: round_currency(tax),
        grand_total: round_currency(grand),
        total_litres: round_volume(litres),
    };
    debug!(
        items = totals.item_count,
        quantity = totals.total_quantity,
        grand_total = %totals.grand_total,
        "aggregated line items"
    );
    totals
}

/// One row of the PO summary: header fields plus the order's totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub po_number: String,
    pub platform: Option<String>,
    pub status: OrderStatus,
    pub order_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub serving_distributor: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl OrderSummary {
    pub fn from_order(order: &Order) -> Self {
        Self {
            po_number: order.po_number().to_string(),
            platform: order.platform_name().map(str::to_string),
            status: order.status,
            order_date: order.order_day(),
            expiry_date: order.expiry_day(),
            serving_distributor: order.serving_distributor.clone(),
            totals: aggregate(&order.items),
        }
    }
}

#[instrument(skip_all)]
pub fn summarize_orders<'a, I>(orders: I) -> Vec<OrderSummary>
where
    I: IntoIterator<Item = &'a Order>,
{
    let summaries: Vec<OrderSummary> = orders.into_iter().map(OrderSummary::from_order).collect();
    debug!(orders = summaries.len(), "summarized orders");
    summaries
}

/// Open/Closed/Cancelled counters. Every status is present, zero if unused.
pub fn count_by_order_status<'a, I>(orders: I) -> BTreeMap<OrderStatus, usize>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut counts: BTreeMap<OrderStatus, usize> =
        OrderStatus::iter().map(|status| (status, 0)).collect();
    for order in orders {
        *counts.entry(order.status).or_insert(0) += 1;
    }
    counts
}

/// Per-status line counts. Every status is present, zero if unused.
pub fn count_by_line_status<'a, I>(items: I) -> BTreeMap<LineItemStatus, usize>
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut counts: BTreeMap<LineItemStatus, usize> =
        LineItemStatus::iter().map(|status| (status, 0)).collect();
    for item in items {
        *counts.entry(item.status).or_insert(0) += 1;
    }
    counts
}
