use thiserror::Error;

use crate::db_types::{Money, OrderId, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    CartEmpty,
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
    #[error("Product {product_id} has an invalid price of {price}")]
    InvalidPrice { product_id: ProductId, price: Money },
    #[error("The order amount is too large. {0}")]
    AmountOverflow(String),
    #[error("Insufficient stock for product {product_id}. {requested} requested, but only {available} available")]
    InsufficientStock { product_id: ProductId, available: i64, requested: i64 },
    /// The order could not be committed. The cause was discovered inside the order creation transaction, after the
    /// cart had already passed validation, and nothing was written.
    #[error("Order creation failed. {0}")]
    OrderCreationFailed(Box<CheckoutError>),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invalid order state transition. {0}")]
    InvalidOrderStateTransition(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}

impl CheckoutError {
    pub fn creation_failed(cause: CheckoutError) -> Self {
        match cause {
            e @ CheckoutError::OrderCreationFailed(_) => e,
            e => CheckoutError::OrderCreationFailed(Box::new(e)),
        }
    }

    /// True for errors that may succeed if the caller refreshes its view of the cart and tries again.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::InsufficientStock { .. } | CheckoutError::DatabaseError(_) => true,
            CheckoutError::OrderCreationFailed(cause) => cause.is_retryable(),
            _ => false,
        }
    }
}

/// Reasons for refusing a payment confirmation. A rejected event leaves every order untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentRejection {
    #[error("Unrecognized transaction. {0}")]
    UnrecognizedTransaction(String),
    #[error("Amount mismatch. Expected {expected}, but received {received}")]
    AmountMismatch { expected: Money, received: Money },
}
