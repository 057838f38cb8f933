use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, PaymentEvent, PaymentEventOutcome, PaymentEventRecord};

pub async fn insert_payment_event(
    payment: &PaymentEvent,
    order_id: Option<OrderId>,
    outcome: PaymentEventOutcome,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PaymentEventRecord, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO payment_events (transaction_id, content, amount, direction, order_id, outcome, reason, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(&payment.transaction_id)
    .bind(&payment.content)
    .bind(payment.amount)
    .bind(payment.direction)
    .bind(order_id)
    .bind(outcome)
    .bind(reason)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_payment_events(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentEventRecord>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM payment_events WHERE transaction_id = $1 ORDER BY id ASC")
        .bind(transaction_id)
        .fetch_all(conn)
        .await?;
    Ok(events)
}
