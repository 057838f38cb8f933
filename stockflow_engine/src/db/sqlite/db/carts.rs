use sqlx::SqliteConnection;

use crate::db_types::{CartItem, UserId};

pub async fn fetch_cart_items(user: UserId, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY added_at ASC, rowid ASC",
    )
    .bind(user)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Sets the quantity of a product in the user's cart, adding the line if it is not there yet.
pub async fn upsert_cart_item(user: UserId, item: CartItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity;
        "#,
    )
    .bind(user)
    .bind(item.product_id)
    .bind(item.quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Removes every line from the user's cart, returning the number of lines removed.
pub async fn clear_cart(user: UserId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user).execute(conn).await?;
    Ok(result.rows_affected())
}
