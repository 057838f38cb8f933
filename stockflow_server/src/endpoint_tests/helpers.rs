use actix_web::{
    body::MessageBody,
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use serde_json::Value;
use stockflow_engine::{
    db_types::{Money, Order, OrderId, OrderItem, OrderStatusType, PaymentStatusType, ProductId, UserId},
    events::EventProducers,
    order_objects::CheckoutConfig,
    traits::CheckoutDatabase,
    OrderFlowApi,
};

use crate::{auth::USER_ID_HEADER, errors::ServerError};

/// Wraps a store in an [`OrderFlowApi`] with default settings and no event subscribers.
pub fn api_for<B: CheckoutDatabase>(db: B) -> OrderFlowApi<B> {
    OrderFlowApi::new(db, CheckoutConfig::default(), EventProducers::default())
}

/// Registers the JSON error handler the server uses, so that malformed bodies produce the same responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub struct TestCall<'a> {
    pub method: Method,
    pub path: &'a str,
    pub user: Option<i64>,
    pub headers: Vec<(&'a str, String)>,
    pub body: Option<String>,
}

impl<'a> TestCall<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        Self { method, path, user: None, headers: vec![], body: None }
    }

    pub fn as_user(mut self, user: i64) -> Self {
        self.user = Some(user);
        self
    }

    pub fn header(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn raw_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

/// Sends a single request through an app built with `configure` and returns the status and body. Errors raised by
/// middleware are rendered the same way actix would render them to a client.
pub async fn send<F>(call: TestCall<'_>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    let mut req = TestRequest::default().method(call.method).uri(call.path);
    if let Some(user) = call.user {
        req = req.insert_header((USER_ID_HEADER, user.to_string()));
    }
    for (name, value) in call.headers {
        req = req.insert_header((name, value));
    }
    if let Some(body) = call.body {
        req = req.insert_header(("Content-Type", "application/json")).set_payload(body);
    }
    debug!("🚀️ Making request to {}", call.path);
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn sample_order(id: i64, user: i64) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap();
    Order {
        id: OrderId(id),
        user_id: UserId(user),
        created_at: created,
        updated_at: created,
        expires_at: created + Duration::minutes(30),
        status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Pending,
        original_amount: Money::from(250_000),
        discount_amount: Money::from(0),
        total_amount: Money::from(250_000),
        shipping_address: "35 Trang Tien, Hanoi".to_string(),
        payment_method: "bank_transfer".to_string(),
        note: None,
        transaction_id: None,
        paid_at: None,
    }
}

pub fn sample_items(id: i64) -> Vec<OrderItem> {
    vec![
        OrderItem {
            order_id: OrderId(id),
            product_id: ProductId(3),
            quantity: 2,
            price_at_purchase: Money::from(100_000),
        },
        OrderItem { order_id: OrderId(id), product_id: ProductId(8), quantity: 1, price_at_purchase: Money::from(50_000) },
    ]
}

pub fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON: {e}. Body: {body}"))
}
