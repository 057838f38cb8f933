//! Legal transitions of the two order status dimensions.
//!
//! Fulfilment (`OrderStatusType`) only moves forward: `Pending -> Processing -> Shipped -> Delivered`, with
//! `Pending -> Cancelled` as the only way out of the happy path. Payment (`PaymentStatusType`) moves from
//! `Pending`/`Waiting` to exactly one of `Paid`, `Failed` or `Cancelled`; a `Paid` order can later be `Refunded` by an
//! administrator.
//!
//! Stock reservations are keyed off the payment dimension: they are held while the payment status is `Pending` or
//! `Waiting` and are settled (consumed or released) on the first transition out of that pair.
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatusType, PaymentStatusType};

impl OrderStatusType {
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Shipped) | (Shipped, Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }

    /// The fulfilment step an administrator may advance to from here, if any.
    pub fn next_fulfilment_step(&self) -> Option<OrderStatusType> {
        match self {
            OrderStatusType::Processing => Some(OrderStatusType::Shipped),
            OrderStatusType::Shipped => Some(OrderStatusType::Delivered),
            _ => None,
        }
    }
}

impl PaymentStatusType {
    pub fn can_transition_to(&self, next: PaymentStatusType) -> bool {
        use PaymentStatusType::*;
        match (self, next) {
            (Pending, Waiting) => true,
            (Pending | Waiting, Paid | Failed | Cancelled) => true,
            (Paid, Refunded) => true,
            _ => false,
        }
    }

    /// No transition of any kind is possible out of a terminal payment status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatusType::Failed | PaymentStatusType::Refunded | PaymentStatusType::Cancelled)
    }

    /// True while the order is still waiting for its money, and therefore still owns a stock reservation.
    pub fn holds_reservation(&self) -> bool {
        matches!(self, PaymentStatusType::Pending | PaymentStatusType::Waiting)
    }
}

/// The ways an order can leave the reservation-holding state without being paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annulment {
    /// The buyer cancelled the order.
    Cancelled,
    /// The expiry sweep reclaimed the order.
    Expired,
    /// The payment gateway reported that the payment failed.
    PaymentFailed,
}

impl Annulment {
    /// The payment status the order is moved to. The fulfilment status always becomes `Cancelled`.
    pub fn payment_status(&self) -> PaymentStatusType {
        match self {
            Annulment::Cancelled | Annulment::Expired => PaymentStatusType::Cancelled,
            Annulment::PaymentFailed => PaymentStatusType::Failed,
        }
    }

    /// Payment statuses the order may be in for this annulment to apply.
    ///
    /// Expiry only reclaims orders for which no payment instructions were ever issued. Buyers and the gateway can
    /// annul orders that are waiting for a transfer too.
    pub fn applies_to(&self) -> &'static [PaymentStatusType] {
        match self {
            Annulment::Expired => &[PaymentStatusType::Pending],
            Annulment::Cancelled | Annulment::PaymentFailed => &[PaymentStatusType::Pending, PaymentStatusType::Waiting],
        }
    }
}

impl std::fmt::Display for Annulment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annulment::Cancelled => write!(f, "cancelled"),
            Annulment::Expired => write!(f, "expired"),
            Annulment::PaymentFailed => write!(f, "payment failed"),
        }
    }
}
