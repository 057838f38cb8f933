use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{CartItem, NewOrder, Order, OrderId, OrderStatusType, PaymentStatusType, Product, UserId},
    engine_api::{
        errors::CheckoutError,
        order_objects::{CheckoutConfig, CheckoutQuote, CheckoutRequest, ExpiryResult, OrderDetail},
        pricing::{merge_cart_lines, price_cart, PricedCart},
    },
    events::{EventProducers, OrderAnnulledEvent, OrderCreatedEvent},
    lifecycle::Annulment,
    traits::CheckoutDatabase,
};

/// `OrderFlowApi` is the primary API for the order lifecycle: turning carts into orders, cancelling and expiring
/// them, reconciling payments and moving paid orders through fulfilment.
pub struct OrderFlowApi<B> {
    db: B,
    config: CheckoutConfig,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.config)
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), config: self.config.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, config: CheckoutConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub(crate) fn producers(&self) -> &EventProducers {
        &self.producers
    }
}

impl<B> OrderFlowApi<B>
where B: CheckoutDatabase
{
    /// Validates and prices the user's cart, and applies their rank discount. Nothing is written.
    pub async fn quote(&self, user: UserId) -> Result<CheckoutQuote, CheckoutError> {
        let priced = self.price_cart_for(user).await?;
        let tier = self.db.fetch_rank(user).await?;
        let discount = self.config.rank_table.quote(priced.total, tier);
        trace!("🛒️ Quote for {user}: {} item(s), {} before a {tier} discount", priced.items.len(), priced.total);
        Ok(CheckoutQuote { items: priced.items, discount })
    }

    /// Turns the user's cart into an order.
    ///
    /// The cart is validated and priced first. If that passes, a single transaction reserves the stock, stores the
    /// order and its items and clears the cart. Availability problems found at that point are reported as
    /// [`CheckoutError::OrderCreationFailed`], so that callers can tell a lost race from a cart that was never valid.
    ///
    /// The order starts as `Pending`/`Pending` and expires after the configured order timeout.
    pub async fn create_order(&self, user: UserId, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        let CheckoutQuote { items, discount } = self.quote(user).await?;
        let expires_at = Utc::now() + self.config.order_timeout;
        let new_order = NewOrder::new(user, items, discount.original_amount, expires_at)
            .with_discount(discount.discount_amount)
            .with_shipping_address(request.shipping_address)
            .with_payment_method(request.payment_method)
            .with_note(request.note);
        let (order, items) = self.db.insert_order_with_reservations(new_order).await.map_err(|e| {
            debug!("🛒️ Checkout for {user} failed. {e}");
            e
        })?;
        info!(
            "🛒️ Order {} created for {user}. {} item(s), total {} ({} {} discount). Expires at {}",
            order.id,
            items.len(),
            order.total_amount,
            discount.tier,
            order.discount_amount,
            order.expires_at
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone(), items)).await;
        Ok(order)
    }

    /// The buyer cancels an order that has not been paid yet. Its stock reservation is released.
    ///
    /// Cancelling an order that the buyer has already cancelled returns the order unchanged.
    pub async fn cancel_order(&self, user: UserId, id: OrderId) -> Result<Order, CheckoutError> {
        if let Some(order) = self.db.annul_order(id, Some(user), Annulment::Cancelled, Utc::now()).await? {
            info!("🛒️ Order {id} cancelled by {user}");
            self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone(), Annulment::Cancelled)).await;
            return Ok(order);
        }
        let order = self.fetch_order_for_user(user, id).await?;
        if order.status == OrderStatusType::Cancelled && order.payment_status == PaymentStatusType::Cancelled {
            debug!("🛒️ Order {id} was already cancelled");
            return Ok(order);
        }
        Err(CheckoutError::InvalidOrderStateTransition(format!(
            "Order {id} cannot be cancelled. Status is {}, payment status is {}",
            order.status, order.payment_status
        )))
    }

    /// Moves the order's payment status from `Pending` to `Waiting` once payment instructions have been issued.
    /// Calling it again while the order is waiting is a no-op.
    pub async fn mark_awaiting_payment(&self, user: UserId, id: OrderId) -> Result<Order, CheckoutError> {
        if let Some(order) = self.db.mark_awaiting_payment(id, user, Utc::now()).await? {
            debug!("🛒️ Order {id} is now waiting for payment with reference {}", id.payment_reference());
            return Ok(order);
        }
        let order = self.fetch_order_for_user(user, id).await?;
        if order.payment_status == PaymentStatusType::Waiting {
            return Ok(order);
        }
        let reason = if order.is_awaiting_payment() && order.is_expired_at(Utc::now()) {
            format!("Order {id} has expired")
        } else {
            format!("Order {id} is not pending payment. Payment status is {}", order.payment_status)
        };
        Err(CheckoutError::InvalidOrderStateTransition(reason))
    }

    /// The order with its items, provided it belongs to `user`.
    pub async fn order_detail(&self, user: UserId, id: OrderId) -> Result<OrderDetail, CheckoutError> {
        let order = self.fetch_order_for_user(user, id).await?;
        let items = self.db.fetch_order_items(id).await?;
        Ok(OrderDetail::new(order, items))
    }

    /// Cancels every order that is still `Pending`/`Pending` and whose expiry lies before `now`, releasing their
    /// reservations.
    ///
    /// Each order is cancelled in its own transaction. An order that was paid or cancelled between being selected and
    /// being processed is skipped, and a failure on one order does not stop the sweep.
    pub async fn expire_stale_orders(&self, now: DateTime<Utc>) -> Result<ExpiryResult, CheckoutError> {
        let candidates = self.db.fetch_expired_orders(now).await?;
        let mut result = ExpiryResult::default();
        if candidates.is_empty() {
            trace!("⏰️ No expired orders");
            return Ok(result);
        }
        debug!("⏰️ {} order(s) have expired", candidates.len());
        for order in candidates {
            match self.db.annul_order(order.id, None, Annulment::Expired, now).await {
                Ok(Some(expired)) => {
                    info!("⏰️ Order {} expired. Its reservations have been released", expired.id);
                    let event = OrderAnnulledEvent::new(expired.clone(), Annulment::Expired);
                    self.producers.publish_order_annulled(event).await;
                    result.expired.push(expired);
                },
                Ok(None) => {
                    debug!("⏰️ Order {} was settled before it could be expired. Skipping", order.id);
                    result.skipped += 1;
                },
                Err(e) => {
                    error!("⏰️ Could not expire order {}. {e}", order.id);
                    result.failed.push((order, e.to_string()));
                },
            }
        }
        Ok(result)
    }

    /// Advances a paid order one fulfilment step: `Processing -> Shipped` or `Shipped -> Delivered`.
    pub async fn advance_order_status(&self, id: OrderId, next: OrderStatusType) -> Result<Order, CheckoutError> {
        let from = match next {
            OrderStatusType::Shipped => OrderStatusType::Processing,
            OrderStatusType::Delivered => OrderStatusType::Shipped,
            _ => {
                return Err(CheckoutError::InvalidOrderStateTransition(format!(
                    "{next} is not a fulfilment step. Orders can only be advanced to Shipped or Delivered"
                )))
            },
        };
        if let Some(order) = self.db.update_fulfilment_status(id, from, next).await? {
            info!("📦️ Order {id} is now {next}");
            return Ok(order);
        }
        let order = self.db.fetch_order(id).await?.ok_or(CheckoutError::OrderNotFound(id))?;
        if order.status == next {
            return Ok(order);
        }
        Err(CheckoutError::InvalidOrderStateTransition(format!(
            "Order {id} cannot move from {} to {next}. Its payment status is {}",
            order.status, order.payment_status
        )))
    }

    /// Marks a paid order as refunded. The stock it consumed is not returned to the shelf.
    pub async fn refund_order(&self, id: OrderId, reason: &str) -> Result<Order, CheckoutError> {
        if let Some(order) = self.db.refund_order(id).await? {
            info!("💸️ Order {id} refunded ({}). Reason: {reason}", order.total_amount);
            if let Err(e) = self.refresh_customer_rank(order.user_id).await {
                error!("💸️ Could not refresh the rank of {} after refunding order {id}. {e}", order.user_id);
            }
            return Ok(order);
        }
        let order = self.db.fetch_order(id).await?.ok_or(CheckoutError::OrderNotFound(id))?;
        if order.payment_status == PaymentStatusType::Refunded {
            return Ok(order);
        }
        Err(CheckoutError::InvalidOrderStateTransition(format!(
            "Order {id} cannot be refunded. Its payment status is {}",
            order.payment_status
        )))
    }

    /// Recomputes the user's rank from their paid orders and stores it.
    pub async fn refresh_customer_rank(&self, user: UserId) -> Result<(), CheckoutError> {
        let spend = self.db.fetch_historical_spend(user).await?;
        let tier = self.config.rank_table.tier_for_spend(spend);
        self.db.update_rank(user, tier).await?;
        trace!("🛒️ {user} has spent {spend} and is ranked {tier}");
        Ok(())
    }

    async fn price_cart_for(&self, user: UserId) -> Result<PricedCart, CheckoutError> {
        let lines = merge_cart_lines(&self.db.fetch_cart_items(user).await?);
        let mut resolved: Vec<(CartItem, Option<Product>)> = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.db.fetch_product(line.product_id).await?;
            resolved.push((line, product));
        }
        price_cart(&resolved)
    }

    /// Orders belonging to other users are reported as not found.
    async fn fetch_order_for_user(&self, user: UserId, id: OrderId) -> Result<Order, CheckoutError> {
        match self.db.fetch_order(id).await? {
            Some(order) if order.user_id == user => Ok(order),
            _ => Err(CheckoutError::OrderNotFound(id)),
        }
    }
}
