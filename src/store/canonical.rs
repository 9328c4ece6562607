//! Canonical JSON
//!
//! Object keys sorted at every depth and two-space indentation, with a
//! trailing newline. The same data always produces the same bytes, so two
//! snapshots can be compared with plain `diff`.

use serde_json::{Map, Value};

pub fn to_canonical_string(value: &Value) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(&sorted(value))?;
    text.push('\n');
    Ok(text)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
