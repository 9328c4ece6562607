//! Response shaping
//!
//! Small in-place edits collectors apply before saving, so that two
//! snapshots of unchanged resources produce identical files.

use serde_json::Value;

/// Drop per-request noise from a response
///
/// Removes `ResponseMetadata.RequestId` (and `ResponseMetadata` itself once
/// empty) and `IsTruncated: false`.
pub fn tidy_response_metadata(mut data: Value) -> Value {
    if let Some(obj) = data.as_object_mut() {
        let empty_metadata = match obj.get_mut("ResponseMetadata") {
            Some(Value::Object(meta)) => {
                meta.remove("RequestId");
                meta.is_empty()
            }
            _ => false,
        };
        if empty_metadata {
            obj.remove("ResponseMetadata");
        }
        if obj.get("IsTruncated") == Some(&Value::Bool(false)) {
            obj.remove("IsTruncated");
        }
    }
    data
}

/// Replace the JSON-encoded string at `key` with its decoded value
///
/// Absent and null fields are left alone.
pub fn decode_json_inline(mut data: Value, key: &str) -> serde_json::Result<Value> {
    if let Some(Value::String(encoded)) = data.get(key) {
        let decoded: Value = serde_json::from_str(encoded)?;
        data[key] = decoded;
    }
    Ok(data)
}

/// Stable sort of the array at `list` by a key taken from each element
pub fn sort_list_by<K, F>(data: &mut Value, list: &str, key: F)
where
    K: Ord,
    F: Fn(&Value) -> K,
{
    if let Some(Value::Array(items)) = data.get_mut(list) {
        items.sort_by_key(|item| key(item));
    }
}

/// String field of an object, or "" when absent
pub fn str_field<'a>(item: &'a Value, field: &str) -> &'a str {
    item.get(field).and_then(Value::as_str).unwrap_or("")
}
