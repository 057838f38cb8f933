//! Stock counters.
//!
//! Every mutation here is a single conditional `UPDATE ... RETURNING`. If the condition does not hold, no row is
//! returned and nothing changes; the counters are never read and written back in separate round trips.
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product, ProductId},
    engine_api::errors::CheckoutError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CheckoutError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, price, stock_quantity)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.price)
    .bind(product.stock_quantity)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Reserves `quantity` units of the product, but only if at least that many are available. Returns `None` if the
/// product does not exist or does not have enough available stock.
pub async fn reserve_stock(
    id: ProductId,
    quantity: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products SET reserved_quantity = reserved_quantity + $1, updated_at = $2
            WHERE id = $3 AND $1 > 0 AND stock_quantity - reserved_quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

/// Returns `quantity` reserved units to available stock.
pub async fn release_stock(
    id: ProductId,
    quantity: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Product, CheckoutError> {
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET reserved_quantity = reserved_quantity - $1, updated_at = $2
            WHERE id = $3 AND reserved_quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    product.ok_or_else(|| {
        CheckoutError::DatabaseError(format!("Cannot release {quantity} units of product {id}. Too few are reserved"))
    })
}

/// Turns `quantity` reserved units into a permanent deduction: both the on-hand and the reserved counts drop.
pub async fn consume_stock(
    id: ProductId,
    quantity: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Product, CheckoutError> {
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET
                stock_quantity = stock_quantity - $1,
                reserved_quantity = reserved_quantity - $1,
                updated_at = $2
            WHERE id = $3 AND reserved_quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    product.ok_or_else(|| {
        CheckoutError::DatabaseError(format!("Cannot consume {quantity} units of product {id}. Too few are reserved"))
    })
}
