use serde::Serialize;

/// Serialize a serde-backed enum into its wire name (e.g. `"device"`).
pub fn serde_enum_name<T: Serialize>(val: &T) -> Option<String> {
    serde_json::to_value(val).ok()?.as_str().map(|s| s.to_string())
}

/// Upper-case the first character: `"bedroom"` -> `"Bedroom"`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `1`, `true` and `TRUE` are on; anything else is off.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE")
}
