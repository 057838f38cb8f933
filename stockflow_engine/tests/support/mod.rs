//! Setup and tear-down for the integration tests. The database helpers live in
//! `stockflow_engine::test_utils::prepare_env`.
#![allow(dead_code)]

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use stockflow_engine::{
    db_types::Product,
    events::EventProducers,
    order_objects::CheckoutConfig,
    test_utils::prepare_env::new_test_db,
    CatalogManagement,
    CheckoutDatabase,
    OrderFlowApi,
    SqliteDatabase,
};

pub async fn setup_with(producers: EventProducers) -> OrderFlowApi<SqliteDatabase> {
    let db = new_test_db(5).await;
    OrderFlowApi::new(db, CheckoutConfig::default(), producers)
}

pub async fn setup() -> OrderFlowApi<SqliteDatabase> {
    setup_with(EventProducers::default()).await
}

pub async fn tear_down(api: OrderFlowApi<SqliteDatabase>) {
    let mut db = api.db().clone();
    let url = db.url().to_string();
    drop(api);
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to remove database {url}: {e}");
    }
}

/// The product as it is stored now.
pub async fn product(db: &SqliteDatabase, product: &Product) -> Product {
    db.fetch_product(product.id).await.expect("Error fetching product").expect("Product does not exist")
}
