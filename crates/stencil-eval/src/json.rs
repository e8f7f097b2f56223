//! Building render data from JSON.

use crate::pool::ValuePool;
use crate::value::{Value, ValueData, ValuesList, ValuesMap};

/// Convert one JSON value. `null` becomes Empty; integers that fit `i64`
/// stay integers, every other number becomes a double.
pub fn value_from_json(json: &serde_json::Value, pool: &ValuePool) -> Value {
    match json {
        serde_json::Value::Null => Value::empty(),
        serde_json::Value::Bool(b) => Value::from(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => n
                .as_f64()
                .map(|d| Value::new(ValueData::Double(d)))
                .unwrap_or_default(),
        },
        serde_json::Value::String(s) => pool.create_string(s.as_str()),
        serde_json::Value::Array(items) => {
            let values: ValuesList = items.iter().map(|item| value_from_json(item, pool)).collect();
            pool.create_list(values)
        }
        serde_json::Value::Object(entries) => pool.create_map(map_from_json(entries, pool)),
    }
}

/// Convert a JSON object into a scope map. Non-objects give an empty map.
pub fn values_from_json(json: &serde_json::Value, pool: &ValuePool) -> ValuesMap {
    match json {
        serde_json::Value::Object(entries) => map_from_json(entries, pool),
        _ => ValuesMap::new(),
    }
}

fn map_from_json(
    entries: &serde_json::Map<String, serde_json::Value>,
    pool: &ValuePool,
) -> ValuesMap {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), value_from_json(value, pool)))
        .collect()
}
