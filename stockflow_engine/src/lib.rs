//! Stockflow Engine
//!
//! The Stockflow engine turns shopping carts into orders without ever overselling stock, reconciles the asynchronous
//! payment confirmations sent by a payment gateway, and reclaims the stock held by orders that are never paid.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`traits`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`OrderFlowApi`]). This provides checkout, cancellation, expiry, payment reconciliation
//!    and fulfilment. Backends need to implement the traits in [`traits`] in order to drive it.
//!
//! ## Stock reservations
//! Placing an order reserves its stock: the units are counted in the product's `reserved_quantity` and are no longer
//! available to other buyers. Every reservation is also recorded in a ledger, one row per order item. A ledger row
//! leaves the `Held` state exactly once, either when the order is paid (the stock is consumed) or when it is
//! cancelled, expires or its payment fails (the stock is released).
//!
//! The engine also provides a set of events that can be subscribed to, for example `OrderPaid` when a payment settles
//! an order. A simple actor framework is used so that you can easily hook into these events and perform custom
//! actions.
mod db;
mod engine_api;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod lifecycle;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits;
pub use engine_api::{
    errors::{CheckoutError, PaymentRejection},
    order_flow_api::OrderFlowApi,
    order_objects,
    pricing,
    ranks,
};
pub use traits::{CartManagement, CatalogManagement, CheckoutDatabase, CustomerRanks, OrderManagement};
