use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderItem, PaymentStatusType},
    lifecycle::Annulment,
};

/// Emitted once the order creation transaction has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Emitted when a payment confirmation settles an order. Duplicate deliveries do not emit a second event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order leaves the reservation-holding state without being paid, i.e. it was cancelled by the
/// buyer, expired, or its payment failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub annulment: Annulment,
    pub payment_status: PaymentStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, annulment: Annulment) -> Self {
        let payment_status = order.payment_status;
        Self { order, annulment, payment_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    OrderAnnulled(OrderAnnulledEvent),
}
