#![allow(dead_code)]

use po_ledger::{orders_from_json, LineItem, Order};
use rust_decimal::Decimal;

/// A backend order listing covering three platforms, string-encoded numbers,
/// stale derived fields, a missing expiry date and one malformed record.
pub const ORDERS_JSON: &str = r#"[
    {
        "id": 1,
        "po_number": "BLK-24-0001",
        "platform": {"id": 1, "pf_name": "Blinkit"},
        "serving_distributor": "Sri Balaji Traders",
        "order_date": "2024-03-01T05:30:00.000Z",
        "expiry_date": "2024-03-15T00:00:00.000Z",
        "status": "Open",
        "city": "Bengaluru",
        "orderItems": [
            {"id": 11, "item_name": "Cow Ghee 1L", "sap_code": "FG1001", "hsn_code": "0405",
             "quantity": 2, "basic_rate": "100.00", "gst_rate": "18.00",
             "landing_rate": "1.00", "status": "PENDING"},
            {"id": 12, "item_name": "Table Butter 500g", "sap_code": "FG2001", "hsn_code": "0405",
             "quantity": "1", "basic_rate": 50, "gst_rate": 0, "status": "Dispatched"}
        ]
    },
    {
        "id": 2,
        "po_number": "BB-24-0042",
        "platform": {"id": "2", "pf_name": "BigBasket"},
        "order_date": "2024-03-05",
        "expiry_date": null,
        "status": "closed",
        "orderItems": [
            {"id": 21, "item_name": "Paneer 200g", "hsn_code": "0406",
             "quantity": "10", "basic_rate": "80", "gst_rate": "5",
             "ean_upc_code": "8901234567890", "mrp": "95", "status": "price_difference"},
            {"id": 22, "item_name": "Curd 400g", "quantity": 6, "basic_rate": "40.50",
             "gst_rate": "5", "total_litres": "2.4", "status": null}
        ]
    },
    {
        "id": 3,
        "po_number": "ZMT-24-0100",
        "platform": {"id": 3, "pf_name": "Zomato"},
        "order_date": "2024-04-02T10:00:00Z",
        "expiry_date": "2024-04-20T10:00:00Z",
        "status": "Cancelled",
        "orderItems": [
            {"id": 31, "item_name": "Ghee Jar 5L", "sap_code": "FG1005", "quantity": 1,
             "basic_rate": "2500", "gst_rate": "12", "gst_amount": "300.00", "status": "Hold"}
        ]
    },
    {
        "id": 4,
        "status": "Open",
        "order_date": "not a date",
        "orderItems": [
            {"id": 41, "item_name": "Orphan line", "quantity": "abc", "basic_rate": "-5"}
        ]
    }
]"#;

pub fn sample_orders() -> Vec<Order> {
    orders_from_json(ORDERS_JSON).expect("fixture parses")
}

/// The two-line reference order: 2 × 100 @ 18% and 1 × 50 @ 0%.
pub fn reference_items() -> Vec<LineItem> {
    vec![
        LineItem::new("Cow Ghee 1L", 2, Decimal::new(100, 0), Decimal::new(18, 0)),
        LineItem::new("Table Butter 500g", 1, Decimal::new(50, 0), Decimal::ZERO),
    ]
}

/// Builds `count` identical low-value lines, handy for pagination checks.
pub fn bulk_items(count: usize) -> Vec<LineItem> {
    (0..count)
        .map(|i| {
            LineItem::new(format!("SKU {i:04}"), 1, Decimal::new(1000, 2), Decimal::new(5, 0))
                .with_id(i as i64)
        })
        .collect()
}
