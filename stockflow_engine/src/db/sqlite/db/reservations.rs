use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewOrderItem, OrderId, ReservationState, StockReservation};

pub async fn insert_reservation(
    order_id: OrderId,
    item: &NewOrderItem,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<StockReservation, sqlx::Error> {
    let reservation = sqlx::query_as(
        r#"
            INSERT INTO stock_reservations (order_id, product_id, quantity, state, created_at)
            VALUES ($1, $2, $3, 'Held', $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(reservation)
}

/// Moves every `Held` reservation of the order to `state`, returning the rows that moved.
///
/// Rows that have already left `Held` are not touched, so the caller adjusts stock counters for exactly the rows
/// returned here and a second call returns nothing.
pub async fn settle_held_reservations(
    order_id: OrderId,
    state: ReservationState,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockReservation>, sqlx::Error> {
    let settled = sqlx::query_as(
        r#"
            UPDATE stock_reservations SET state = $1, settled_at = $2
            WHERE order_id = $3 AND state = 'Held'
            RETURNING *;
        "#,
    )
    .bind(state)
    .bind(now)
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(settled)
}

pub async fn fetch_reservations(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockReservation>, sqlx::Error> {
    let reservations = sqlx::query_as("SELECT * FROM stock_reservations WHERE order_id = $1 ORDER BY product_id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(reservations)
}
