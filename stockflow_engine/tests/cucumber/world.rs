use std::collections::HashMap;

use cucumber::World;
use log::*;
use stockflow_engine::{
    db_types::{OrderId, Product},
    events::EventProducers,
    order_objects::{CheckoutConfig, PaymentOutcome},
    test_utils::prepare_env::new_test_db,
    CheckoutDatabase,
    CheckoutError,
    OrderFlowApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct CheckoutWorld {
    pub system: Option<CheckoutSystem>,
    /// Products by the name used in the feature file
    pub products: HashMap<String, Product>,
    /// Orders by the label used in the feature file
    pub orders: HashMap<String, OrderId>,
    pub last_error: Option<CheckoutError>,
    pub last_payment: Option<PaymentOutcome>,
}

#[derive(Debug)]
pub struct CheckoutSystem {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase>,
}

impl CheckoutWorld {
    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.system.as_ref().expect("OrderFlowApi not initialised").api
    }

    pub fn product(&self, name: &str) -> &Product {
        self.products.get(name).unwrap_or_else(|| panic!("No product called {name}"))
    }

    pub fn order(&self, label: &str) -> OrderId {
        *self.orders.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }
}

impl CheckoutSystem {
    pub async fn new() -> Self {
        let db = new_test_db(5).await;
        let url = db.url().to_string();
        debug!("Created database: {url}");
        let api = OrderFlowApi::new(db, CheckoutConfig::default(), EventProducers::default());
        Self { db_path: url, api }
    }
}
