use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use chrono::Utc;
use serde_json::json;
use stockflow_engine::{
    db_types::{CartItem, Money, PaymentStatusType, Product, ProductId, Tier, UserId},
    CheckoutError,
};

use super::{
    helpers::{api_for, parse, sample_items, sample_order, send, TestCall},
    mocks::MockStore,
};
use crate::routes::{AwaitingPaymentRoute, CancelOrderRoute, CheckoutRoute, OrderByIdRoute, QuoteRoute};

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(api_for(store)))
            .service(QuoteRoute::<MockStore>::new())
            .service(CheckoutRoute::<MockStore>::new())
            .service(OrderByIdRoute::<MockStore>::new())
            .service(CancelOrderRoute::<MockStore>::new())
            .service(AwaitingPaymentRoute::<MockStore>::new());
    }
}

fn store_with_order(owner: i64) -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(move |id| Ok(Some(sample_order(id.0, owner))));
    store.expect_fetch_order_items().returning(|id| Ok(sample_items(id.0)));
    store
}

fn product(id: i64, price: i64, stock: i64, reserved: i64) -> Product {
    Product {
        id: ProductId(id),
        name: format!("Product {id}"),
        price: Money::from(price),
        stock_quantity: stock,
        reserved_quantity: reserved,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn fetch_order_without_user_header() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send(TestCall::new(Method::GET, "/orders/1"), configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("X-User-Id header was not provided"), "was: {body}");
}

#[actix_web::test]
async fn fetch_my_order() {
    let _ = env_logger::try_init().ok();
    let call = TestCall::new(Method::GET, "/orders/ORD41").as_user(7);
    let (status, body) = send(call, configure(store_with_order(7))).await;
    assert_eq!(status, StatusCode::OK);
    let detail = parse(&body);
    assert_eq!(detail["order"]["id"], 41);
    assert_eq!(detail["order"]["total_amount"], 250_000);
    assert_eq!(detail["payment_reference"], "ORD41");
    assert_eq!(detail["items"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn another_users_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let call = TestCall::new(Method::GET, "/orders/41").as_user(8);
    let (status, body) = send(call, configure(store_with_order(7))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains("Hanoi"), "Order details leaked: {body}");
}

#[actix_web::test]
async fn malformed_order_id() {
    let _ = env_logger::try_init().ok();
    let call = TestCall::new(Method::GET, "/orders/not-a-number").as_user(7);
    let (status, body) = send(call, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not a valid order id"), "was: {body}");
}

#[actix_web::test]
async fn quote_applies_rank_discount() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_items().returning(|_| Ok(vec![CartItem::new(ProductId(3), 2)]));
    store.expect_fetch_product().returning(|id| Ok(Some(product(id.0, 500_000, 10, 0))));
    store.expect_fetch_rank().returning(|_| Ok(Tier::Gold));
    let call = TestCall::new(Method::POST, "/checkout/quote").as_user(7);
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let quote = parse(&body);
    assert_eq!(quote["discount"]["original_amount"], 1_000_000);
    assert!(quote["discount"]["discount_amount"].as_i64().unwrap_or_default() > 0, "was: {body}");
}

#[actix_web::test]
async fn checkout_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_items().returning(|_| Ok(vec![]));
    store.expect_insert_order_with_reservations().never();
    let call = TestCall::new(Method::POST, "/checkout")
        .as_user(7)
        .json(json!({"shipping_address": "35 Trang Tien", "payment_method": "bank_transfer"}));
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("cart is empty"), "was: {body}");
}

#[actix_web::test]
async fn checkout_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_items().returning(|_| Ok(vec![CartItem::new(ProductId(3), 5)]));
    store.expect_fetch_product().returning(|id| Ok(Some(product(id.0, 100_000, 6, 3))));
    store.expect_insert_order_with_reservations().never();
    let call = TestCall::new(Method::POST, "/checkout")
        .as_user(7)
        .json(json!({"shipping_address": "35 Trang Tien", "payment_method": "bank_transfer"}));
    let (status, _) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn checkout_creates_an_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_items().returning(|_| Ok(vec![CartItem::new(ProductId(3), 2)]));
    store.expect_fetch_product().returning(|id| Ok(Some(product(id.0, 100_000, 10, 0))));
    store.expect_fetch_rank().returning(|_| Ok(Tier::Bronze));
    store.expect_insert_order_with_reservations().times(1).returning(|order| {
        assert_eq!(order.user_id, UserId(7));
        assert_eq!(order.items.len(), 1);
        Ok((sample_order(12, 7), sample_items(12)))
    });
    store.expect_fetch_order_items().returning(|id| Ok(sample_items(id.0)));
    let call = TestCall::new(Method::POST, "/checkout")
        .as_user(7)
        .json(json!({"shipping_address": "35 Trang Tien", "payment_method": "bank_transfer", "note": "Ring twice"}));
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let detail = parse(&body);
    assert_eq!(detail["payment_reference"], "ORD12");
    assert_eq!(detail["order"]["payment_status"], "Pending");
}

#[actix_web::test]
async fn checkout_with_a_malformed_body() {
    let _ = env_logger::try_init().ok();
    let call = TestCall::new(Method::POST, "/checkout").as_user(7).raw_body("{\"shipping_address\": ");
    let (status, body) = send(call, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"), "was: {body}");
}

#[actix_web::test]
async fn cancel_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_annul_order().times(1).returning(|_, _, _, _| Ok(None));
    store.expect_fetch_order().returning(|id| {
        let mut order = sample_order(id.0, 7);
        order.payment_status = PaymentStatusType::Paid;
        Ok(Some(order))
    });
    let call = TestCall::new(Method::POST, "/orders/5/cancel").as_user(7);
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("cannot be cancelled"), "was: {body}");
}

#[actix_web::test]
async fn cancel_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_annul_order().times(1).returning(|id, user, _, _| {
        assert_eq!(user, Some(UserId(7)));
        let mut order = sample_order(id.0, 7);
        order.payment_status = PaymentStatusType::Cancelled;
        Ok(Some(order))
    });
    let call = TestCall::new(Method::POST, "/orders/5/cancel").as_user(7);
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert_eq!(parse(&body)["payment_status"], "Cancelled");
}

#[actix_web::test]
async fn awaiting_payment_on_an_expired_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_mark_awaiting_payment().returning(|_, _, _| Ok(None));
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id.0, 7))));
    let call = TestCall::new(Method::POST, "/orders/9/awaiting_payment").as_user(7);
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("has expired"), "was: {body}");
}

#[actix_web::test]
async fn backend_failures_are_not_leaked() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order()
        .returning(|_| Err(CheckoutError::DatabaseError("database is locked at /srv/data/stockflow.db".into())));
    let call = TestCall::new(Method::GET, "/orders/3").as_user(7);
    let (status, body) = send(call, configure(store)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("/srv/data"), "was: {body}");
}
