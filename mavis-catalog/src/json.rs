//! Tolerant `serde_json::Value` accessors, grounded on the original's
//! `JSONUtils.hpp` helpers: a missing key is never an error by itself,
//! only a caller that requires the key turns its absence into one.

use serde_json::Value;

/// `obj.key`, falling back to `default` when the key is absent or `null`.
pub fn find_or<'a>(obj: &'a Value, key: &str, default: &'a Value) -> &'a Value {
    match obj.get(key) {
        Some(v) if !v.is_null() => v,
        _ => default,
    }
}

/// Parses a `"0x..."` or bare-hex/decimal string into a `u64`. Returns
/// `None` for anything that isn't a string, or a string that doesn't parse.
pub fn as_hex_u64(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Collects a JSON array of strings into `Vec<String>`; non-string
/// elements are skipped rather than rejected (tolerant, per §4.3
/// "unrecognized keys are ignored").
pub fn as_string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `obj.key` as a plain string, if present and a string.
pub fn as_string(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}
