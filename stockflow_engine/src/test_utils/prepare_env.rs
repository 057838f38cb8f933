use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{CartItem, Money, NewProduct, OrderId, Product, UserId},
    SqliteDatabase,
};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A fresh database file in the system temp directory.
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("stockflow_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {p}");
}

/// Creates a migrated throw-away database and connects to it.
pub async fn new_test_db(max_connections: u32) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating connection to database")
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: i64, stock: i64) -> Product {
    db.add_product(NewProduct::new(name, Money::from(price), stock)).await.expect("Error seeding product")
}

pub async fn seed_cart(db: &SqliteDatabase, user: UserId, items: &[CartItem]) {
    for item in items {
        db.set_cart_item(user, *item).await.expect("Error seeding cart");
    }
}

/// Rewinds the order's expiry so that it has already lapsed.
pub async fn expire_order_now(db: &SqliteDatabase, id: OrderId) {
    let past = chrono::Utc::now() - chrono::Duration::minutes(1);
    sqlx::query("UPDATE orders SET expires_at = $1 WHERE id = $2")
        .bind(past)
        .bind(id)
        .execute(db.pool())
        .await
        .expect("Error rewinding order expiry");
}

/// Records a paid order for the user outside of the checkout flow, to give them purchase history.
pub async fn seed_paid_spend(db: &SqliteDatabase, user: UserId, amount: i64) {
    let now = chrono::Utc::now();
    sqlx::query(
        r#"
            INSERT INTO orders (
                user_id, created_at, updated_at, expires_at, status, payment_status,
                original_amount, discount_amount, total_amount, shipping_address, payment_method, transaction_id, paid_at
            ) VALUES ($1, $2, $2, $2, 'Delivered', 'Paid', $3, 0, $3, 'history', 'seed', $4, $2)
        "#,
    )
    .bind(user)
    .bind(now)
    .bind(amount)
    .bind(format!("seed-{}", rand::random::<u64>()))
    .execute(db.pool())
    .await
    .expect("Error seeding purchase history");
}
