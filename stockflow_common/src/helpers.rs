use std::str::FromStr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a strictly positive number, e.g. a timeout or interval. Returns `None` for missing, malformed or
/// non-positive values so that callers can fall back to their default.
pub fn parse_positive<T>(value: Option<String>) -> Option<T>
where T: FromStr + PartialOrd + Default {
    value.and_then(|v| v.trim().parse::<T>().ok()).filter(|v| *v > T::default())
}
