use cucumber::given;
use stockflow_engine::{
    db_types::{CartItem, UserId},
    test_utils::prepare_env::{seed_cart, seed_paid_spend, seed_product},
};

use crate::cucumber::{world::CheckoutSystem, CheckoutWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut CheckoutWorld) {
    let system = CheckoutSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a product {string} priced at {int} VND with {int} in stock")]
async fn add_product(world: &mut CheckoutWorld, name: String, price: i64, stock: i64) {
    let product = seed_product(world.api().db(), &name, price, stock).await;
    world.products.insert(name, product);
}

#[given(expr = "customer {int} has {int} of {string} in their cart")]
async fn fill_cart(world: &mut CheckoutWorld, user: i64, quantity: i64, name: String) {
    let item = CartItem::new(world.product(&name).id, quantity);
    seed_cart(world.api().db(), UserId(user), &[item]).await;
}

#[given(expr = "customer {int} has spent {int} VND on past orders")]
async fn purchase_history(world: &mut CheckoutWorld, user: i64, amount: i64) {
    seed_paid_spend(world.api().db(), UserId(user), amount).await;
    world.api().refresh_customer_rank(UserId(user)).await.expect("Error refreshing rank");
}
