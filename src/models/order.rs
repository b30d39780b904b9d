use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;
use strum::IntoEnumIterator;

use super::line_item::LineItem;
use super::numeric::{
    lenient_list, lenient_optional_id, lenient_optional_record, lenient_optional_string,
    lenient_string,
};
use super::status_key;
use crate::common::lenient_datetime;
use crate::errors::LedgerError;

/// Header-level lifecycle flag of a purchase order, independent of the
/// statuses of its lines.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter, strum::Display,
)]
pub enum OrderStatus {
    #[default]
    #[strum(to_string = "Open")]
    Open,
    #[strum(to_string = "Closed")]
    Closed,
    #[strum(to_string = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key = status_key(raw);
        if key == "canceled" {
            return Some(Self::Cancelled);
        }
        Self::iter().find(|status| status_key(&status.to_string()) == key)
    }
}

impl FromStr for OrderStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| LedgerError::InvalidStatus(s.to_string()))
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .and_then(Self::parse_lenient)
            .unwrap_or_default())
    }
}

/// The marketplace or distributor a purchase order was raised on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        alias = "pf_name",
        alias = "distributor_name",
        default,
        deserialize_with = "lenient_string"
    )]
    pub name: String,
}

impl Platform {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A purchase order header together with the lines it owns.
///
/// Aggregates (quantities, costs, totals) are never stored on the order; use
/// [`crate::services::aggregation`] to compute them from `items`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "lenient_optional_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    po_number: String,
    #[serde(default, deserialize_with = "lenient_optional_record")]
    pub platform: Option<Platform>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub serving_distributor: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub area: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(
        default,
        alias = "orderItems",
        alias = "order_items",
        deserialize_with = "lenient_list"
    )]
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn new(po_number: impl Into<String>) -> Self {
        Self {
            id: None,
            po_number: po_number.into(),
            platform: None,
            serving_distributor: None,
            order_date: None,
            expiry_date: None,
            appointment_date: None,
            region: None,
            state: None,
            city: None,
            area: None,
            status: OrderStatus::Open,
            items: Vec::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_dates(
        mut self,
        order_date: Option<DateTime<Utc>>,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.order_date = order_date;
        self.expiry_date = expiry_date;
        self
    }

    pub fn with_items(mut self, items: Vec<LineItem>) -> Self {
        self.items = items;
        self
    }

    /// The PO number is fixed once the order exists.
    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.platform
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn platform_id(&self) -> Option<&str> {
        self.platform
            .as_ref()
            .map(|p| p.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn order_day(&self) -> Option<NaiveDate> {
        self.order_date.map(|ts| ts.date_naive())
    }

    pub fn expiry_day(&self) -> Option<NaiveDate> {
        self.expiry_date.map(|ts| ts.date_naive())
    }

    pub fn push_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// Each line joined with this order's header context.
    pub fn item_views(&self) -> impl Iterator<Item = OrderItemView<'_>> + '_ {
        self.items.iter().map(move |item| OrderItemView { order: self, item })
    }
}

/// A line item seen together with its parent order, as listed in the
/// cross-order "order items" view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderItemView<'a> {
    pub order: &'a Order,
    pub item: &'a LineItem,
}

impl<'a> OrderItemView<'a> {
    pub fn po_number(&self) -> &'a str {
        self.order.po_number()
    }

    pub fn platform_name(&self) -> Option<&'a str> {
        self.order.platform_name()
    }
}

/// Flattens orders into their line views, preserving order and line sequence.
pub fn flatten_items(orders: &[Order]) -> Vec<OrderItemView<'_>> {
    orders.iter().flat_map(Order::item_views).collect()
}
