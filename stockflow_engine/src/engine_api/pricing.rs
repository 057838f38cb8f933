use log::trace;

use crate::{
    db_types::{CartItem, Money, NewOrderItem, Product},
    engine_api::errors::CheckoutError,
};

/// The validated, priced contents of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<NewOrderItem>,
    /// The total before any rank discount.
    pub total: Money,
}

/// Lines for the same product are folded into the first occurrence.
pub fn merge_cart_lines(lines: &[CartItem]) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged
}

/// Validates each cart line against the product it refers to and snapshots the current unit price.
///
/// `lines` pairs every cart line with the product it resolved to, if any. No state is touched here; availability is
/// checked again, atomically, when the order is committed.
pub fn price_cart(lines: &[(CartItem, Option<Product>)]) -> Result<PricedCart, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::CartEmpty);
    }
    let mut items = Vec::with_capacity(lines.len());
    for (line, product) in lines {
        let product = product.as_ref().ok_or(CheckoutError::ProductNotFound(line.product_id))?;
        if line.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity { product_id: line.product_id, quantity: line.quantity });
        }
        let available = product.available();
        if available < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id,
                available,
                requested: line.quantity,
            });
        }
        if product.price.is_negative() {
            return Err(CheckoutError::InvalidPrice { product_id: line.product_id, price: product.price });
        }
        trace!("🛒️ {} x {} @ {}", line.quantity, product.name, product.price);
        items.push(NewOrderItem { product_id: line.product_id, quantity: line.quantity, price_at_purchase: product.price });
    }
    let mut total = Money::default();
    for item in &items {
        total = item.line_total().and_then(|amount| total.checked_add(amount)).ok_or_else(|| {
            let line = format!("{} x {}", item.quantity, item.price_at_purchase);
            CheckoutError::AmountOverflow(format!("Cannot add {line} for product {}", item.product_id))
        })?;
    }
    Ok(PricedCart { items, total })
}
