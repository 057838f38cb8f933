//! # Database management and control.
//!
//! This module defines the contracts that storage backends implement in order to drive the checkout engine.
//!
//! ## Collaborators
//! The cart, the product catalog and the customer rank store belong to the surrounding shop. The engine only reads
//! from them (and clears the cart on checkout), through [`CartManagement`], [`CatalogManagement`] and
//! [`CustomerRanks`].
//!
//! ## Orders
//! * [`OrderManagement`] provides read-only queries over orders, their items, reservations and the payment audit log.
//! * [`CheckoutDatabase`] is the highest level of behaviour. Every method is a single atomic transaction that starts
//!   with its guarding write, so that concurrent writers queue on the database write lock instead of acting on stale
//!   reads.
mod checkout_database;
mod collaborators;
mod order_management;

pub use checkout_database::CheckoutDatabase;
pub use collaborators::{CartManagement, CatalogManagement, CustomerRanks};
pub use order_management::OrderManagement;
