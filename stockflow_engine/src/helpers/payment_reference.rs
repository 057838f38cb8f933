use regex::Regex;

use crate::db_types::OrderId;

/// Finds the order referenced in the free-text content of a bank transfer.
///
/// Buyers are asked to quote `ORD<id>`, but bank apps and buyers mangle the content freely, so the prefix is matched
/// case-insensitively and may be followed by a single `-`, `_` or space. The first reference found wins.
pub fn extract_order_reference(content: &str) -> Option<OrderId> {
    let reference = Regex::new(r"(?i)\bORD[-_ ]?(\d{1,18})\b").ok()?;
    reference.captures(content).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse::<i64>().ok()).map(OrderId)
}
