use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Tier, UserId};

pub async fn fetch_rank(user: UserId, conn: &mut SqliteConnection) -> Result<Option<Tier>, sqlx::Error> {
    let tier = sqlx::query_scalar("SELECT rank FROM customer_ranks WHERE user_id = $1")
        .bind(user)
        .fetch_optional(conn)
        .await?;
    Ok(tier)
}

pub async fn upsert_rank(user: UserId, tier: Tier, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO customer_ranks (user_id, rank, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET rank = excluded.rank, updated_at = excluded.updated_at;
        "#,
    )
    .bind(user)
    .bind(tier)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
