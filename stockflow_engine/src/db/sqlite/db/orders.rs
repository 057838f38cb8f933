use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType, PaymentEvent, UserId},
    lifecycle::Annulment,
};

/// Inserts a new `Pending`/`Pending` order. This is not atomic. Embed the call in a transaction, passing `&mut tx` as
/// the connection, if it must commit together with other writes.
pub async fn insert_order(
    order: &NewOrder,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                created_at,
                updated_at,
                expires_at,
                original_amount,
                discount_amount,
                total_amount,
                shipping_address,
                payment_method,
                note
            ) VALUES ($1, $2, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(now)
    .bind(order.expires_at)
    .bind(order.original_amount)
    .bind(order.discount_amount)
    .bind(order.total_amount)
    .bind(&order.shipping_address)
    .bind(&order.payment_method)
    .bind(&order.note)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_item(
    order_id: OrderId,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.price_at_purchase)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY rowid ASC")
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_orders_for_user(user: UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_expired_orders(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 'Pending' AND payment_status = 'Pending' AND expires_at < $1
            ORDER BY expires_at ASC;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// The sum of the user's orders that are currently paid.
pub async fn historical_spend(user: UserId, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE user_id = $1 AND payment_status = 'Paid'",
    )
    .bind(user)
    .fetch_one(conn)
    .await?;
    Ok(Money::from(total))
}

/// Cancels the order if it is still `Pending` and its payment status is one that `annulment` applies to.
///
/// This is the guard for releasing the order's reservations. Returns `None` if the order does not exist, belongs to
/// someone other than `user` (when given), has already left those states, or, for expiry, has not expired yet.
pub async fn annul_order(
    id: OrderId,
    user: Option<UserId>,
    annulment: Annulment,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let from_statuses =
        annulment.applies_to().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(", ");
    let mut query = format!(
        r#"
            UPDATE orders SET status = 'Cancelled', payment_status = $1, updated_at = $2
            WHERE id = $3 AND status = 'Pending' AND payment_status IN ({from_statuses})
        "#
    );
    if user.is_some() {
        query.push_str(" AND user_id = $4");
    }
    if annulment == Annulment::Expired {
        query.push_str(" AND expires_at < $2");
    }
    query.push_str(" RETURNING *;");
    trace!("📝️ Annulling order {id} ({annulment})");
    let mut q = sqlx::query_as::<Sqlite, Order>(&query).bind(annulment.payment_status()).bind(now).bind(id);
    if let Some(user) = user {
        q = q.bind(user);
    }
    let order = q.fetch_optional(conn).await?;
    Ok(order)
}

pub async fn mark_awaiting_payment(
    id: OrderId,
    user: UserId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payment_status = 'Waiting', updated_at = $1
            WHERE id = $2 AND user_id = $3 AND status = 'Pending' AND payment_status = 'Pending' AND expires_at >= $1
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(user)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Marks the order as paid by `payment`, provided it is awaiting payment, the amount matches the order total exactly,
/// and the transaction has not already paid for any order.
pub async fn mark_paid(
    id: OrderId,
    payment: &PaymentEvent,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = 'Paid',
                status = 'Processing',
                transaction_id = $1,
                paid_at = $2,
                updated_at = $2
            WHERE id = $3
                AND status = 'Pending'
                AND payment_status IN ('Pending', 'Waiting')
                AND total_amount = $4
                AND NOT EXISTS (SELECT 1 FROM orders WHERE transaction_id = $1)
            RETURNING *;
        "#,
    )
    .bind(&payment.transaction_id)
    .bind(now)
    .bind(id)
    .bind(payment.amount)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn update_fulfilment_status(
    id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4 AND payment_status = 'Paid'
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn mark_refunded(
    id: OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payment_status = 'Refunded', updated_at = $1
            WHERE id = $2 AND payment_status = 'Paid'
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
