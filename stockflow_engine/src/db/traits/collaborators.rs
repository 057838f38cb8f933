use crate::{
    db_types::{CartItem, Money, Product, ProductId, Tier, UserId},
    engine_api::errors::CheckoutError,
};

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Fetches the product with the given id, including its current stock and reservation counters.
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, CheckoutError>;
}

#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// The lines in the user's cart, in the order they were added.
    async fn fetch_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, CheckoutError>;

    /// Empties the user's cart. Checkout clears the cart as part of the order transaction, so this is only needed
    /// by collaborators.
    async fn clear_cart(&self, user: UserId) -> Result<(), CheckoutError>;
}

#[allow(async_fn_in_trait)]
pub trait CustomerRanks {
    /// The user's lifetime spend on orders that are currently paid.
    async fn fetch_historical_spend(&self, user: UserId) -> Result<Money, CheckoutError>;

    /// The user's cached rank. Users without a recorded rank are [`Tier::Bronze`].
    async fn fetch_rank(&self, user: UserId) -> Result<Tier, CheckoutError>;

    /// Records a newly computed rank for the user.
    async fn update_rank(&self, user: UserId, tier: Tier) -> Result<(), CheckoutError>;
}
