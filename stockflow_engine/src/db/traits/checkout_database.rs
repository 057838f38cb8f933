use chrono::{DateTime, Utc};

use crate::{
    db_types::{
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PaymentEvent,
        PaymentEventOutcome,
        UserId,
    },
    engine_api::{errors::CheckoutError, order_objects::PaymentOutcome},
    lifecycle::Annulment,
    traits::{CartManagement, CatalogManagement, CustomerRanks, OrderManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the checkout engine.
///
/// This behaviour includes:
/// * Committing new orders and reserving their stock
/// * Releasing reservations when an order is cancelled, expires or its payment fails
/// * Settling payments, which turns reservations into permanent stock deductions
/// * Post-payment fulfilment and refunds
///
/// Every method that changes an order does so with a single guarded update: the write only applies if the order is
/// still in the state the transition starts from. When the guard does not match, nothing is written and `None` is
/// returned, so callers can decide whether that is an idempotent retry or an illegal transition.
#[allow(async_fn_in_trait)]
pub trait CheckoutDatabase: Clone + CatalogManagement + CartManagement + CustomerRanks + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order, and in a single atomic transaction:
    /// * reserves the stock for every item with a conditional increment of `reserved_quantity`,
    /// * stores the order, its items and one `Held` reservation ledger row per item,
    /// * clears the user's cart.
    ///
    /// If any item no longer has enough available stock, nothing is written and the failure is returned wrapped in
    /// [`CheckoutError::OrderCreationFailed`].
    async fn insert_order_with_reservations(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), CheckoutError>;

    /// Moves an order that is still holding stock to `Cancelled` with the payment status dictated by `annulment`,
    /// and releases its `Held` reservations in the same transaction.
    ///
    /// If `user` is given, the order must belong to that user. [`Annulment::Expired`] additionally requires
    /// `expires_at < now`. Returns `None` if the order was not in a state this annulment applies to.
    async fn annul_order(
        &self,
        id: OrderId,
        user: Option<UserId>,
        annulment: Annulment,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CheckoutError>;

    /// Moves a `Pending` payment to `Waiting`, once payment instructions have been issued to the buyer. Orders past
    /// their expiry are not eligible. Returns `None` if the guard did not match.
    async fn mark_awaiting_payment(
        &self,
        id: OrderId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CheckoutError>;

    /// Settles the order with the payment event in a single transaction. On success the order becomes
    /// `Processing`/`Paid`, the transaction id is recorded and every `Held` reservation is consumed, decrementing
    /// both the reserved and the on-hand stock.
    ///
    /// A repeat of the transaction that already paid the order is reported as a duplicate. Any other mismatch is
    /// reported as a rejection, and nothing is written.
    async fn settle_payment(&self, id: OrderId, payment: &PaymentEvent) -> Result<PaymentOutcome, CheckoutError>;

    /// Appends an entry to the payment event audit log.
    async fn record_payment_event(
        &self,
        payment: &PaymentEvent,
        order_id: Option<OrderId>,
        outcome: PaymentEventOutcome,
        reason: Option<String>,
    ) -> Result<(), CheckoutError>;

    /// Advances a paid order's fulfilment status from `from` to `to`. Returns `None` if the guard did not match.
    async fn update_fulfilment_status(
        &self,
        id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, CheckoutError>;

    /// Moves a `Paid` order to `Refunded`. Stock is not returned to the shelf. Returns `None` if the order was not
    /// paid.
    async fn refund_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CheckoutError>;
}
