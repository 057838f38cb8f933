mod payment_reference;

pub use payment_reference::extract_order_reference;
