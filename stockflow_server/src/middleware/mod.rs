mod admin;
mod hmac;

pub use admin::{AdminTokenMiddlewareFactory, AdminTokenMiddlewareService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService};
