//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! SQLite allows a single writer at a time. Every transaction here opens with its guarding `UPDATE`, so the write
//! lock is taken before anything is read and concurrent writers simply queue behind the busy timeout. Reading first
//! and upgrading to a write later would let two transactions act on the same stale snapshot.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, payment_events, products, ranks, reservations};
use crate::{
    db_types::{
        CartItem,
        Money,
        NewOrder,
        NewProduct,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PaymentEvent,
        PaymentEventOutcome,
        PaymentEventRecord,
        Product,
        ProductId,
        ReservationState,
        StockReservation,
        Tier,
        UserId,
    },
    engine_api::{
        errors::{CheckoutError, PaymentRejection},
        order_objects::PaymentOutcome,
    },
    lifecycle::Annulment,
    traits::{CartManagement, CatalogManagement, CheckoutDatabase, CustomerRanks, OrderManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `SF_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await
    }

    /// Adds a product to the catalog. Catalog management belongs to the shop; this exists to seed stock.
    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product {} ({}) added with {} units in stock", product.id, product.name, product.stock_quantity);
        Ok(product)
    }

    /// Sets a line in the user's cart. Cart management belongs to the shop; this exists to seed carts.
    pub async fn set_cart_item(&self, user: UserId, item: CartItem) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        carts::upsert_cart_item(user, item, &mut conn).await?;
        Ok(())
    }
}

/// Reserves stock and writes the order, its items, the reservation ledger and the cart clearance.
async fn write_new_order(
    order: NewOrder,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(Order, Vec<OrderItem>), CheckoutError> {
    for item in &order.items {
        if products::reserve_stock(item.product_id, item.quantity, now, conn).await?.is_none() {
            let err = match products::fetch_product(item.product_id, conn).await? {
                None => CheckoutError::ProductNotFound(item.product_id),
                Some(p) => CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    available: p.available(),
                    requested: item.quantity,
                },
            };
            debug!("🗃️ Could not reserve {} units of product {}. {err}", item.quantity, item.product_id);
            return Err(err);
        }
        trace!("🗃️ Reserved {} units of product {}", item.quantity, item.product_id);
    }
    let new_order = orders::insert_order(&order, now, conn).await?;
    let mut items = Vec::with_capacity(order.items.len());
    for item in &order.items {
        items.push(orders::insert_order_item(new_order.id, item, conn).await?);
        reservations::insert_reservation(new_order.id, item, now, conn).await?;
    }
    let cleared = carts::clear_cart(order.user_id, conn).await?;
    trace!("🗃️ Cleared {cleared} lines from the cart of {}", order.user_id);
    Ok((new_order, items))
}

/// Moves the order's `Held` reservations to `state` and adjusts the stock counters for exactly those rows.
async fn settle_reservations(
    id: OrderId,
    state: ReservationState,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockReservation>, CheckoutError> {
    let settled = reservations::settle_held_reservations(id, state, now, conn).await?;
    for r in &settled {
        match state {
            ReservationState::Released => products::release_stock(r.product_id, r.quantity, now, conn).await?,
            ReservationState::Consumed => products::consume_stock(r.product_id, r.quantity, now, conn).await?,
            ReservationState::Held => {
                return Err(CheckoutError::DatabaseError("Reservations cannot be settled back to Held".into()))
            },
        };
    }
    Ok(settled)
}

/// Works out why a payment guard did not match. Nothing is written.
async fn classify_rejected_payment(
    id: OrderId,
    payment: &PaymentEvent,
    conn: &mut SqliteConnection,
) -> Result<PaymentOutcome, CheckoutError> {
    use PaymentRejection::*;
    let Some(order) = orders::fetch_order(id, conn).await? else {
        return Ok(PaymentOutcome::Rejected(UnrecognizedTransaction(format!("Order {id} does not exist"))));
    };
    if order.transaction_id.as_deref() == Some(payment.transaction_id.as_str()) {
        return Ok(PaymentOutcome::Duplicate(order));
    }
    if let Some(other) = orders::fetch_order_by_transaction_id(&payment.transaction_id, conn).await? {
        return Ok(PaymentOutcome::Rejected(UnrecognizedTransaction(format!(
            "Transaction {} has already paid for order {}",
            payment.transaction_id, other.id
        ))));
    }
    if !order.is_awaiting_payment() || order.status != OrderStatusType::Pending {
        return Ok(PaymentOutcome::Rejected(UnrecognizedTransaction(format!(
            "Order {id} is not awaiting payment. Its payment status is {}",
            order.payment_status
        ))));
    }
    if order.total_amount != payment.amount {
        return Ok(PaymentOutcome::Rejected(AmountMismatch {
            expected: order.total_amount,
            received: payment.amount,
        }));
    }
    Ok(PaymentOutcome::Rejected(UnrecognizedTransaction(format!("Order {id} could not be settled"))))
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let items = carts::fetch_cart_items(user, &mut conn).await?;
        Ok(items)
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        carts::clear_cart(user, &mut conn).await?;
        Ok(())
    }
}

impl CustomerRanks for SqliteDatabase {
    async fn fetch_historical_spend(&self, user: UserId) -> Result<Money, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let spend = orders::historical_spend(user, &mut conn).await?;
        Ok(spend)
    }

    async fn fetch_rank(&self, user: UserId) -> Result<Tier, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let tier = ranks::fetch_rank(user, &mut conn).await?;
        Ok(tier.unwrap_or_default())
    }

    async fn update_rank(&self, user: UserId, tier: Tier) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        ranks::upsert_rank(user, tier, &mut conn).await?;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_expired_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_expired_orders(now, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_reservations(&self, id: OrderId) -> Result<Vec<StockReservation>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let reservations = reservations::fetch_reservations(id, &mut conn).await?;
        Ok(reservations)
    }

    async fn fetch_payment_events(&self, transaction_id: &str) -> Result<Vec<PaymentEventRecord>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let events = payment_events::fetch_payment_events(transaction_id, &mut conn).await?;
        Ok(events)
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_reservations(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), CheckoutError> {
        let mut tx = self.pool.begin().await.map_err(|e| CheckoutError::creation_failed(e.into()))?;
        let user = order.user_id;
        let (order, items) =
            write_new_order(order, Utc::now(), &mut tx).await.map_err(CheckoutError::creation_failed)?;
        tx.commit().await.map_err(|e| CheckoutError::creation_failed(e.into()))?;
        debug!("🗃️ Order {} for {user} committed with {} items, total {}", order.id, items.len(), order.total_amount);
        Ok((order, items))
    }

    async fn annul_order(
        &self,
        id: OrderId,
        user: Option<UserId>,
        annulment: Annulment,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::annul_order(id, user, annulment, now, &mut tx).await? else {
            trace!("🗃️ Order {id} is not eligible to be {annulment}. Nothing to do");
            return Ok(None);
        };
        let released = settle_reservations(id, ReservationState::Released, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {id} {annulment}. {} reservations released", released.len());
        Ok(Some(order))
    }

    async fn mark_awaiting_payment(
        &self,
        id: OrderId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_awaiting_payment(id, user, now, &mut conn).await?;
        Ok(order)
    }

    async fn settle_payment(&self, id: OrderId, payment: &PaymentEvent) -> Result<PaymentOutcome, CheckoutError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        match orders::mark_paid(id, payment, now, &mut tx).await? {
            Some(order) => {
                let consumed = settle_reservations(id, ReservationState::Consumed, now, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Order {id} paid by {}. {} reservations consumed", payment.transaction_id, consumed.len());
                Ok(PaymentOutcome::Accepted(order))
            },
            None => {
                let outcome = classify_rejected_payment(id, payment, &mut tx).await?;
                tx.rollback().await?;
                Ok(outcome)
            },
        }
    }

    async fn record_payment_event(
        &self,
        payment: &PaymentEvent,
        order_id: Option<OrderId>,
        outcome: PaymentEventOutcome,
        reason: Option<String>,
    ) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let record =
            payment_events::insert_payment_event(payment, order_id, outcome, reason.as_deref(), &mut conn).await?;
        trace!("🗃️ Payment event #{} for {} recorded as {outcome}", record.id, record.transaction_id);
        Ok(())
    }

    async fn update_fulfilment_status(
        &self,
        id: OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_fulfilment_status(id, from, to, Utc::now(), &mut conn).await?;
        Ok(order)
    }

    async fn refund_order(&self, id: OrderId) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_refunded(id, Utc::now(), &mut conn).await?;
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), CheckoutError> {
        self.pool.close().await;
        Ok(())
    }
}
