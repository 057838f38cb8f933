pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
mod payment_api;
pub mod pricing;
pub mod ranks;
