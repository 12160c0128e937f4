use serde_json::Value;

pub(crate) fn int_field(entry: &Value, key: &str) -> Option<i64> {
    let value = entry.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|raw| raw.min(i64::MAX as u64) as i64))
        .or_else(|| value.as_f64().map(|raw| raw as i64))
}

/// First integer found among `keys`, in order.
pub(crate) fn int_any(entry: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| int_field(entry, key))
}

pub(crate) fn bool_any(entry: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_bool))
}

pub(crate) fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

pub(crate) fn non_empty_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    str_field(entry, key).filter(|text| !text.is_empty())
}

/// `key` when present, else the midpoint of `key_min`/`key_max` where a
/// missing bound counts as `default`.
pub(crate) fn averaged_int(entry: &Value, key: &str, default: i64) -> i64 {
    if let Some(exact) = int_field(entry, key) {
        return exact;
    }
    let min = int_field(entry, &format!("{key}_min"));
    let max = int_field(entry, &format!("{key}_max"));
    if min.is_none() && max.is_none() {
        return default;
    }
    (min.unwrap_or(default) + max.unwrap_or(default)) / 2
}

pub(crate) fn to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
