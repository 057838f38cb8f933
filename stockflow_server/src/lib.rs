//! # Stockflow server
//! This crate hosts the HTTP front end of the Stockflow checkout engine. It is responsible for:
//! * Taking orders from buyers, and reserving their stock.
//! * Receiving payment confirmations (and failures) from the payment gateway's webhooks.
//! * Sweeping up orders that are never paid, so that their stock goes back on sale.
//! * Exposing a handful of admin routes for fulfilment and refunds.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/checkout/quote`, `/api/checkout`: Price the buyer's cart, and place an order.
//! * `/api/orders/{id}`, `/api/orders/{id}/cancel`, `/api/orders/{id}/awaiting_payment`: Order detail and buyer
//!   actions.
//! * `/webhook/payment`, `/webhook/payment_failed`: The payment gateway's notifications. HMAC-signed.
//! * `/admin/orders/{id}/status`, `/admin/orders/{id}/refund`, `/admin/expire`: Admin actions. Bearer-token protected.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
