pub mod line_item;
pub mod numeric;
pub mod order;

pub use line_item::{apply_bulk_status, LineItem, LineItemStatus};
pub use order::{flatten_items, Order, OrderItemView, OrderStatus, Platform};

/// Canonical comparison key for status labels: lowercase with separators
/// (`_`, `-`, whitespace) removed, so `PRICE_DIFFERENCE`, `Price Difference`
/// and `PriceDifference` all compare equal.
pub fn status_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !(c.is_whitespace() || *c == '_' || *c == '-'))
        .flat_map(char::to_lowercase)
        .collect()
}
