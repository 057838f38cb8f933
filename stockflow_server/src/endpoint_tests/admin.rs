use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use serde_json::json;
use stockflow_common::Secret;
use stockflow_engine::db_types::{Money, OrderStatusType, PaymentStatusType, Tier};

use super::{
    helpers::{api_for, parse, sample_order, send, TestCall},
    mocks::MockStore,
};
use crate::{
    middleware::AdminTokenMiddlewareFactory,
    routes::{ExpireOrdersRoute, RefundOrderRoute, UpdateOrderStatusRoute},
};

const TOKEN: &str = "back-office-token";

fn configure(store: MockStore, token: &str) -> impl FnOnce(&mut ServiceConfig) {
    let token = Secret::new(token.to_string());
    move |cfg| {
        let scope = web::scope("/admin")
            .wrap(AdminTokenMiddlewareFactory::new(token))
            .service(UpdateOrderStatusRoute::<MockStore>::new())
            .service(RefundOrderRoute::<MockStore>::new())
            .service(ExpireOrdersRoute::<MockStore>::new());
        cfg.app_data(web::Data::new(api_for(store))).service(scope);
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let _ = env_logger::try_init().ok();
    let call = TestCall::new(Method::POST, "/admin/expire");
    let (status, _) = send(call, configure(MockStore::new(), TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let call = TestCall::new(Method::POST, "/admin/expire").header("Authorization", bearer("guess"));
    let (status, _) = send(call, configure(MockStore::new(), TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // With no token configured, even an empty bearer token is refused
    let call = TestCall::new(Method::POST, "/admin/expire").header("Authorization", bearer(""));
    let (status, _) = send(call, configure(MockStore::new(), "")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn ship_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_update_fulfilment_status().times(1).returning(|id, from, to| {
        assert_eq!(from, OrderStatusType::Processing);
        assert_eq!(to, OrderStatusType::Shipped);
        let mut order = sample_order(id.0, 4);
        order.status = to;
        order.payment_status = PaymentStatusType::Paid;
        Ok(Some(order))
    });
    let call = TestCall::new(Method::PATCH, "/admin/orders/ORD15/status")
        .header("Authorization", bearer(TOKEN))
        .json(json!({"status": "Shipped"}));
    let (status, body) = send(call, configure(store, TOKEN)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert_eq!(parse(&body)["status"], "Shipped");
}

#[actix_web::test]
async fn orders_cannot_be_moved_backwards() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_update_fulfilment_status().never();
    let call = TestCall::new(Method::PATCH, "/admin/orders/15/status")
        .header("Authorization", bearer(TOKEN))
        .json(json!({"status": "Pending"}));
    let (status, body) = send(call, configure(store, TOKEN)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("not a fulfilment step"), "was: {body}");
}

#[actix_web::test]
async fn refund_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_refund_order().times(1).returning(|id| {
        let mut order = sample_order(id.0, 4);
        order.status = OrderStatusType::Delivered;
        order.payment_status = PaymentStatusType::Refunded;
        Ok(Some(order))
    });
    store.expect_fetch_historical_spend().returning(|_| Ok(Money::from(0)));
    store.expect_update_rank().times(1).returning(|_, tier| {
        assert_eq!(tier, Tier::Bronze);
        Ok(())
    });
    let call = TestCall::new(Method::POST, "/admin/orders/15/refund")
        .header("Authorization", bearer(TOKEN))
        .json(json!({"reason": "Arrived damaged"}));
    let (status, body) = send(call, configure(store, TOKEN)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert_eq!(parse(&body)["payment_status"], "Refunded");
}

#[actix_web::test]
async fn expire_on_demand() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_expired_orders().returning(|_| Ok(vec![sample_order(21, 1), sample_order(22, 2)]));
    store.expect_annul_order().returning(|id, user, _, _| {
        assert!(user.is_none());
        if id.0 == 21 {
            let mut order = sample_order(id.0, 1);
            order.status = OrderStatusType::Cancelled;
            order.payment_status = PaymentStatusType::Cancelled;
            Ok(Some(order))
        } else {
            // Paid while the sweep was running
            Ok(None)
        }
    });
    let call = TestCall::new(Method::POST, "/admin/expire").header("Authorization", bearer(TOKEN));
    let (status, body) = send(call, configure(store, TOKEN)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let summary = parse(&body);
    assert_eq!(summary["expired"], json!([21]));
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["failed"], json!([]));
}
