use chrono::{DateTime, Utc};

use crate::{
    db_types::{Order, OrderId, OrderItem, PaymentEventRecord, StockReservation, UserId},
    engine_api::errors::CheckoutError,
};

/// Read-only queries over orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError>;

    async fn fetch_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, CheckoutError>;

    /// All orders for the user, newest first.
    async fn fetch_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, CheckoutError>;

    /// Orders that are still `Pending`/`Pending` and whose `expires_at` lies before `now`, oldest first.
    async fn fetch_expired_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, CheckoutError>;

    /// The reservation ledger rows for the order, one per item.
    async fn fetch_reservations(&self, id: OrderId) -> Result<Vec<StockReservation>, CheckoutError>;

    /// The audit log entries for the given gateway transaction id, oldest first.
    async fn fetch_payment_events(&self, transaction_id: &str) -> Result<Vec<PaymentEventRecord>, CheckoutError>;
}
