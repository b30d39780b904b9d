//! Free-text and structured filtering of orders and order lines.
//!
//! Each sub-predicate is evaluated independently and the results are ANDed.
//! A record that lacks a field only fails the predicates that need that field;
//! it never stops the scan of the rest of the collection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::common::DateRange;
use crate::models::{status_key, LineItem, Order, OrderItemView};

/// Sentinel accepted by the status and counterparty selectors to mean "no filter".
pub const ALL: &str = "all";

/// A selector that either matches everything or one specific value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Reads a UI-style selector value: `"all"` (any case) or an empty value
    /// disables the filter.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
            Selection::All
        } else {
            Selection::Only(trimmed.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl From<Option<&str>> for Selection {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Selection::parse).unwrap_or_default()
    }
}

/// Request-scoped filter state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub term: Option<String>,
    pub status: Selection,
    /// Counterparty (platform or distributor) identifier.
    pub counterparty: Selection,
    pub order_date: DateRange,
    pub expiry_date: DateRange,
}

impl FilterCriteria {
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_status(mut self, status: impl AsRef<str>) -> Self {
        self.status = Selection::parse(status.as_ref());
        self
    }

    pub fn with_counterparty(mut self, counterparty: impl AsRef<str>) -> Self {
        self.counterparty = Selection::parse(counterparty.as_ref());
        self
    }

    pub fn with_order_date(mut self, range: DateRange) -> Self {
        self.order_date = range;
        self
    }

    pub fn with_expiry_date(mut self, range: DateRange) -> Self {
        self.expiry_date = range;
        self
    }

    /// Lowercased search term, or `None` when blank.
    fn normalized_term(&self) -> Option<String> {
        self.term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// True when any structured filter deviates from its default. The search
    /// term is not counted.
    pub fn is_active(&self) -> bool {
        !self.status.is_all()
            || !self.counterparty.is_all()
            || !self.order_date.is_unbounded()
            || !self.expiry_date.is_unbounded()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The fields a record exposes to filtering.
pub trait Filterable {
    /// Values the free-text term is matched against. Absent fields are omitted.
    fn search_fields(&self) -> Vec<&str>;

    fn status_label(&self) -> Option<String>;

    fn counterparty_id(&self) -> Option<&str>;

    fn order_day(&self) -> Option<NaiveDate>;

    fn expiry_day(&self) -> Option<NaiveDate>;

    /// Records missing their identity are excluded from every result.
    fn is_well_formed(&self) -> bool {
        true
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl Filterable for LineItem {
    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.item_name.as_str()),
            self.sap_code.as_deref(),
            self.hsn_code.as_deref(),
        ]
        .into_iter()
        .filter_map(non_empty)
        .collect()
    }

    fn status_label(&self) -> Option<String> {
        Some(self.status.to_string())
    }

    fn counterparty_id(&self) -> Option<&str> {
        None
    }

    fn order_day(&self) -> Option<NaiveDate> {
        None
    }

    fn expiry_day(&self) -> Option<NaiveDate> {
        None
    }
}

impl Filterable for OrderItemView<'_> {
    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.item.item_name.as_str()),
            Some(self.order.po_number()),
            self.order.platform_name(),
            self.item.sap_code.as_deref(),
            self.item.hsn_code.as_deref(),
        ]
        .into_iter()
        .filter_map(non_empty)
        .collect()
    }

    fn status_label(&self) -> Option<String> {
        Some(self.item.status.to_string())
    }

    fn counterparty_id(&self) -> Option<&str> {
        self.order.platform_id()
    }

    fn order_day(&self) -> Option<NaiveDate> {
        self.order.order_day()
    }

    fn expiry_day(&self) -> Option<NaiveDate> {
        self.order.expiry_day()
    }

    fn is_well_formed(&self) -> bool {
        Filterable::is_well_formed(self.order)
    }
}

impl Filterable for Order {
    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.po_number()),
            self.platform_name(),
            Some(self.status.as_str()),
        ]
        .into_iter()
        .filter_map(non_empty)
        .collect()
    }

    fn status_label(&self) -> Option<String> {
        Some(self.status.to_string())
    }

    fn counterparty_id(&self) -> Option<&str> {
        self.platform_id()
    }

    fn order_day(&self) -> Option<NaiveDate> {
        Order::order_day(self)
    }

    fn expiry_day(&self) -> Option<NaiveDate> {
        Order::expiry_day(self)
    }

    fn is_well_formed(&self) -> bool {
        !self.po_number().trim().is_empty() && self.platform.is_some()
    }
}

impl<T: Filterable + ?Sized> Filterable for &T {
    fn search_fields(&self) -> Vec<&str> {
        (**self).search_fields()
    }

    fn status_label(&self) -> Option<String> {
        (**self).status_label()
    }

    fn counterparty_id(&self) -> Option<&str> {
        (**self).counterparty_id()
    }

    fn order_day(&self) -> Option<NaiveDate> {
        (**self).order_day()
    }

    fn expiry_day(&self) -> Option<NaiveDate> {
        (**self).expiry_day()
    }

    fn is_well_formed(&self) -> bool {
        (**self).is_well_formed()
    }
}

fn matches_term<R: Filterable + ?Sized>(record: &R, term: Option<&str>) -> bool {
    match term {
        None => true,
        Some(term) => record
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(term)),
    }
}

fn matches_status<R: Filterable + ?Sized>(record: &R, selection: &Selection) -> bool {
    match selection {
        Selection::All => true,
        Selection::Only(wanted) => record
            .status_label()
            .is_some_and(|label| status_key(&label) == status_key(wanted)),
    }
}

fn matches_counterparty<R: Filterable + ?Sized>(record: &R, selection: &Selection) -> bool {
    match selection {
        Selection::All => true,
        Selection::Only(wanted) => record.counterparty_id() == Some(wanted.as_str()),
    }
}

fn matches_with_term<R: Filterable + ?Sized>(
    record: &R,
    criteria: &FilterCriteria,
    term: Option<&str>,
) -> bool {
    record.is_well_formed()
        && matches_term(record, term)
        && matches_status(record, &criteria.status)
        && matches_counterparty(record, &criteria.counterparty)
        && criteria.order_date.admits(record.order_day())
        && criteria.expiry_date.admits(record.expiry_day())
}

/// Evaluates one record against the criteria.
pub fn matches<R: Filterable + ?Sized>(record: &R, criteria: &FilterCriteria) -> bool {
    let term = criteria.normalized_term();
    matches_with_term(record, criteria, term.as_deref())
}

/// Returns the matching records in their original order.
#[instrument(skip_all, fields(active = criteria.is_active()))]
pub fn filter<'a, R: Filterable>(records: &'a [R], criteria: &FilterCriteria) -> Vec<&'a R> {
    let term = criteria.normalized_term();
    let kept: Vec<&R> = records
        .iter()
        .filter(|record| matches_with_term(*record, criteria, term.as_deref()))
        .collect();
    debug!(total = records.len(), kept = kept.len(), "filtered records");
    kept
}
