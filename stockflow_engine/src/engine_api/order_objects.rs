use std::fmt::Display;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Money, NewOrderItem, Order, OrderItem},
    engine_api::{
        errors::PaymentRejection,
        ranks::{DiscountQuote, RankTable},
    },
};

pub const DEFAULT_ORDER_TIMEOUT_MINUTES: i64 = 30;

/// Tunables for the checkout flow.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// How long an unpaid order holds its stock before the expiry sweep may reclaim it.
    pub order_timeout: Duration,
    pub rank_table: RankTable,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self { order_timeout: Duration::minutes(DEFAULT_ORDER_TIMEOUT_MINUTES), rank_table: RankTable::default() }
    }
}

impl CheckoutConfig {
    pub fn with_order_timeout(mut self, timeout: Duration) -> Self {
        self.order_timeout = timeout;
        self
    }

    pub fn with_rank_table(mut self, table: RankTable) -> Self {
        self.rank_table = table;
        self
    }
}

/// Buyer-supplied details for a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub payment_method: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl CheckoutRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(shipping_address: S1, payment_method: S2) -> Self {
        Self { shipping_address: shipping_address.into(), payment_method: payment_method.into(), note: None }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// What the buyer would pay if they checked out their cart right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutQuote {
    pub items: Vec<NewOrderItem>,
    pub discount: DiscountQuote,
}

impl CheckoutQuote {
    pub fn total(&self) -> Money {
        self.discount.final_amount
    }
}

/// Everything a client needs to render an order and poll for its payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// The text the buyer must include in the bank transfer.
    pub payment_reference: String,
}

impl OrderDetail {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let payment_reference = order.id.payment_reference();
        Self { order, items, payment_reference }
    }
}

/// The result of reconciling one payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The event settled the order.
    Accepted(Order),
    /// The order had already been settled by this same transaction. Nothing changed.
    Duplicate(Order),
    Rejected(PaymentRejection),
}

impl PaymentOutcome {
    /// Accepted and duplicate events are both acknowledged to the gateway.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, PaymentOutcome::Rejected(_))
    }

    pub fn order(&self) -> Option<&Order> {
        match self {
            PaymentOutcome::Accepted(o) | PaymentOutcome::Duplicate(o) => Some(o),
            PaymentOutcome::Rejected(_) => None,
        }
    }
}

impl Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOutcome::Accepted(o) => write!(f, "Accepted. Order {} is paid", o.id),
            PaymentOutcome::Duplicate(o) => write!(f, "Duplicate. Order {} was already paid", o.id),
            PaymentOutcome::Rejected(r) => write!(f, "Rejected. {r}"),
        }
    }
}

/// The result of one expiry sweep.
#[derive(Debug, Clone, Default)]
pub struct ExpiryResult {
    /// Orders this sweep cancelled.
    pub expired: Vec<Order>,
    /// Orders that were settled by someone else between selection and cancellation.
    pub skipped: usize,
    /// Orders that could not be cancelled. They will be retried on the next sweep.
    pub failed: Vec<(Order, String)>,
}

impl ExpiryResult {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.skipped == 0 && self.failed.is_empty()
    }
}
