use chrono::Utc;
use cucumber::{then, when};
use stockflow_engine::{
    db_types::{Money, OrderStatusType, PaymentEvent, PaymentStatusType, Tier, UserId},
    order_objects::{CheckoutRequest, PaymentOutcome},
    test_utils::prepare_env::expire_order_now,
    CatalogManagement,
    CheckoutError,
    CustomerRanks,
    OrderManagement,
    PaymentRejection,
};

use crate::cucumber::CheckoutWorld;

fn request() -> CheckoutRequest {
    CheckoutRequest::new("1 Dong Khoi, Ho Chi Minh City", "bank_transfer")
}

#[when(expr = "customer {int} checks out as order {word}")]
async fn checkout(world: &mut CheckoutWorld, user: i64, label: String) {
    let order = world.api().create_order(UserId(user), request()).await.expect("Checkout failed");
    world.orders.insert(label, order.id);
}

#[when(expr = "customer {int} tries to check out")]
async fn try_checkout(world: &mut CheckoutWorld, user: i64) {
    world.last_error = world.api().create_order(UserId(user), request()).await.err();
}

#[when(expr = "customer {int} cancels order {word}")]
async fn cancel(world: &mut CheckoutWorld, user: i64, label: String) {
    let id = world.order(&label);
    world.last_error = world.api().cancel_order(UserId(user), id).await.err();
}

#[when(expr = "customer {int} is sent payment instructions for order {word}")]
async fn awaiting_payment(world: &mut CheckoutWorld, user: i64, label: String) {
    let id = world.order(&label);
    world.api().mark_awaiting_payment(UserId(user), id).await.expect("Error marking order as awaiting payment");
}

#[when(expr = "order {word} passes its expiry time")]
async fn lapse(world: &mut CheckoutWorld, label: String) {
    let id = world.order(&label);
    expire_order_now(world.api().db(), id).await;
}

#[when("the expiry sweep runs")]
async fn sweep(world: &mut CheckoutWorld) {
    let result = world.api().expire_stale_orders(Utc::now()).await.expect("Error running expiry sweep");
    assert!(result.failed.is_empty(), "{:?}", result.failed);
}

#[when(expr = "a transfer of {int} VND arrives with transaction {word} and content {string}")]
async fn transfer(world: &mut CheckoutWorld, amount: i64, txid: String, content: String) {
    let payment = PaymentEvent::incoming(txid, content, Money::from(amount));
    let outcome = world.api().handle_payment_event(payment).await.expect("Error handling payment event");
    world.last_payment = Some(outcome);
}

#[when(expr = "a transfer of {int} VND arrives with transaction {word} for order {word}")]
async fn transfer_for_order(world: &mut CheckoutWorld, amount: i64, txid: String, label: String) {
    let content = format!("Thanh toan {}", world.order(&label).payment_reference());
    transfer(world, amount, txid, content).await;
}

#[then(expr = "the payment is {word}")]
async fn payment_outcome(world: &mut CheckoutWorld, expected: String) {
    let outcome = world.last_payment.as_ref().expect("No payment has been received");
    let matched = match expected.as_str() {
        "accepted" => matches!(outcome, PaymentOutcome::Accepted(_)),
        "duplicate" => matches!(outcome, PaymentOutcome::Duplicate(_)),
        "unrecognised" => {
            matches!(outcome, PaymentOutcome::Rejected(PaymentRejection::UnrecognizedTransaction(_)))
        },
        "short" => matches!(outcome, PaymentOutcome::Rejected(PaymentRejection::AmountMismatch { .. })),
        other => panic!("Unknown payment outcome {other}"),
    };
    assert!(matched, "Expected the payment to be {expected}, but it was {outcome}");
}

#[then(expr = "the checkout fails because only {int} {string} are available")]
async fn insufficient_stock(world: &mut CheckoutWorld, available: i64, name: String) {
    let product_id = world.product(&name).id;
    let err = match world.last_error.as_ref().expect("The checkout succeeded") {
        CheckoutError::OrderCreationFailed(cause) => cause.as_ref(),
        e => e,
    };
    match err {
        CheckoutError::InsufficientStock { product_id: p, available: a, .. } => {
            assert_eq!(*p, product_id);
            assert_eq!(*a, available);
        },
        e => panic!("Unexpected error {e}"),
    }
}

#[then("the checkout fails because the cart is empty")]
async fn empty_cart(world: &mut CheckoutWorld) {
    assert_eq!(world.last_error, Some(CheckoutError::CartEmpty));
}

#[then("the cancellation is refused")]
async fn cancellation_refused(world: &mut CheckoutWorld) {
    let err = world.last_error.as_ref().expect("The cancellation succeeded");
    assert!(matches!(err, CheckoutError::InvalidOrderStateTransition(_)), "Unexpected error {err}");
}

#[then(expr = "product {string} has {int} in stock and {int} reserved")]
async fn stock_levels(world: &mut CheckoutWorld, name: String, stock: i64, reserved: i64) {
    let id = world.product(&name).id;
    let product = world.api().db().fetch_product(id).await.expect("Error fetching product").expect("No product");
    assert_eq!(product.stock_quantity, stock, "stock of {name}");
    assert_eq!(product.reserved_quantity, reserved, "reserved units of {name}");
}

#[then(expr = "order {word} has status {word} and payment status {word}")]
async fn order_status(world: &mut CheckoutWorld, label: String, status: String, payment_status: String) {
    let id = world.order(&label);
    let order = world.api().db().fetch_order(id).await.expect("Error fetching order").expect("No order");
    let status = status.parse::<OrderStatusType>().expect("Not an order status");
    let payment_status = payment_status.parse::<PaymentStatusType>().expect("Not a payment status");
    assert_eq!(order.status, status);
    assert_eq!(order.payment_status, payment_status);
}

#[then(expr = "order {word} costs {int} VND after a discount of {int} VND")]
async fn order_totals(world: &mut CheckoutWorld, label: String, total: i64, discount: i64) {
    let id = world.order(&label);
    let order = world.api().db().fetch_order(id).await.expect("Error fetching order").expect("No order");
    assert_eq!(order.discount_amount, Money::from(discount));
    assert_eq!(order.total_amount, Money::from(total));
    assert_eq!(order.original_amount, Money::from(total + discount));
}

#[then(expr = "customer {int} is ranked {word}")]
async fn ranked(world: &mut CheckoutWorld, user: i64, tier: String) {
    let tier = tier.parse::<Tier>().expect("Not a tier");
    let rank = world.api().db().fetch_rank(UserId(user)).await.expect("Error fetching rank");
    assert_eq!(rank, tier);
}
