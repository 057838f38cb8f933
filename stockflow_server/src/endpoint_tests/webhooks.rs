use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use serde_json::json;
use stockflow_common::Secret;
use stockflow_engine::{
    db_types::{CartItem, Order, OrderStatusType, PaymentEventOutcome, PaymentStatusType, UserId},
    order_objects::CheckoutRequest,
    test_utils::prepare_env::{new_test_db, seed_cart, seed_product},
    traits::OrderManagement,
    OrderFlowApi,
    SqliteDatabase,
};

use super::helpers::{api_for, parse, send, TestCall};
use crate::{
    config::{ServerOptions, DEFAULT_HMAC_HEADER},
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::{PaymentFailedWebhookRoute, PaymentWebhookRoute},
};

const SECRET: &str = "gateway-signing-key";

fn configure(api: OrderFlowApi<SqliteDatabase>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(DEFAULT_HMAC_HEADER, Secret::new(SECRET.to_string()), true))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(PaymentFailedWebhookRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(ServerOptions::default())).service(scope);
    }
}

/// A fresh database holding one pending order for 2 x 120,000 VND.
async fn setup() -> (OrderFlowApi<SqliteDatabase>, Order) {
    let api = api_for(new_test_db(5).await);
    let kettle = seed_product(api.db(), "Kettle", 120_000, 5).await;
    seed_cart(api.db(), UserId(3), &[CartItem::new(kettle.id, 2)]).await;
    let order = api.create_order(UserId(3), CheckoutRequest::new("9 Le Loi, Hue", "bank_transfer")).await.unwrap();
    (api, order)
}

fn signed(path: &str, body: serde_json::Value) -> TestCall<'_> {
    let signature = calculate_hmac(SECRET, body.to_string().as_bytes());
    TestCall::new(Method::POST, path).header(DEFAULT_HMAC_HEADER, signature).json(body)
}

#[actix_web::test]
async fn signed_payment_settles_the_order() {
    let (api, order) = setup().await;
    let body = json!({
        "transaction_id": "FT24140ABC",
        "content": format!("NGUYEN VAN A chuyen tien {}", order.id.payment_reference()),
        "amount": 240_000
    });
    let (status, response) = send(signed("/webhook/payment", body.clone()), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "was: {response}");
    let ack = parse(&response);
    assert_eq!(ack["accepted"], true);
    assert_eq!(ack["transaction_id"], "FT24140ABC");

    let paid = api.db().fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(paid.status, OrderStatusType::Processing);
    assert_eq!(paid.payment_status, PaymentStatusType::Paid);
    assert_eq!(paid.transaction_id.as_deref(), Some("FT24140ABC"));

    // The gateway retries. The replay is acknowledged and nothing changes.
    let (status, response) = send(signed("/webhook/payment", body), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&response)["accepted"], true);
    let events = api.db().fetch_payment_events("FT24140ABC").await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].outcome, PaymentEventOutcome::Duplicate);
}

#[actix_web::test]
async fn short_payment_is_acknowledged_but_not_accepted() {
    let (api, order) = setup().await;
    let body = json!({"transaction_id": "FT-SHORT", "content": order.id.payment_reference(), "amount": 200_000});
    let (status, response) = send(signed("/webhook/payment", body), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "was: {response}");
    assert_eq!(parse(&response)["accepted"], false);
    let unchanged = api.db().fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.payment_status, PaymentStatusType::Pending);
    assert_eq!(unchanged.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn unsigned_and_tampered_payments_are_refused() {
    let (api, order) = setup().await;
    let body = json!({"transaction_id": "FT-FORGED", "content": order.id.payment_reference(), "amount": 240_000});
    let call = TestCall::new(Method::POST, "/webhook/payment").json(body.clone());
    let (status, _) = send(call, configure(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let signature = calculate_hmac(SECRET, body.to_string().as_bytes());
    let tampered = json!({"transaction_id": "FT-FORGED", "content": order.id.payment_reference(), "amount": 1});
    let call = TestCall::new(Method::POST, "/webhook/payment").header(DEFAULT_HMAC_HEADER, signature).json(tampered);
    let (status, _) = send(call, configure(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let unchanged = api.db().fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.payment_status, PaymentStatusType::Pending);
    assert!(api.db().fetch_payment_events("FT-FORGED").await.unwrap().is_empty());
}

#[actix_web::test]
async fn payment_failure_releases_the_order() {
    let (api, order) = setup().await;
    let body = json!({"order_reference": order.id.payment_reference(), "reason": "Card declined"});
    let (status, response) = send(signed("/webhook/payment_failed", body), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "was: {response}");
    let ack = parse(&response);
    assert_eq!(ack["accepted"], true);
    assert_eq!(ack["order_reference"], order.id.payment_reference());
    let failed = api.db().fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(failed.status, OrderStatusType::Cancelled);
    assert_eq!(failed.payment_status, PaymentStatusType::Failed);

    let body = json!({"order_reference": "ORDER-NINE", "reason": "Card declined"});
    let (status, _) = send(signed("/webhook/payment_failed", body), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_failure_does_not_reveal_order_state() {
    let (api, order) = setup().await;
    let reference = order.id.payment_reference();
    let payment = json!({"transaction_id": "FT-PAID", "content": reference.clone(), "amount": 240_000});
    let (status, _) = send(signed("/webhook/payment", payment), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let body = json!({"order_reference": reference.clone(), "reason": "Card declined"});
    let (status, response) = send(signed("/webhook/payment_failed", body), configure(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "was: {response}");
    assert_eq!(parse(&response), json!({"accepted": false, "order_reference": reference}));
    assert!(!response.contains("Paid"), "Order state leaked: {response}");
    let paid = api.db().fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(paid.payment_status, PaymentStatusType::Paid);

    let body = json!({"order_reference": "ORD999", "reason": "Card declined"});
    let (status, response) = send(signed("/webhook/payment_failed", body), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "was: {response}");
    assert_eq!(parse(&response), json!({"accepted": false, "order_reference": "ORD999"}));
    assert!(!response.contains("does not exist"), "Order state leaked: {response}");
}
