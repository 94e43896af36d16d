use std::collections::HashMap;

use serde_json::Value;

use crate::execution::{error::PlanExecutionError, keys::compose_key};

/// Follows the resolver's result path from the response data.
/// Short-circuits to `None` on a missing or null step.
pub fn lift_data<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = data;
    for field in path {
        current = current.as_object()?.get(field)?;
    }
    if current.is_null() {
        return None;
    }
    Some(current)
}

/// Indexes returned entities by their composed key.
/// The first entity wins when a key repeats. Entities missing a key field are skipped.
pub fn index_by_keys<'a>(
    data: &'a Value,
    export_keys: &[String],
    key_variables: &[String],
) -> Result<HashMap<String, &'a Value>, PlanExecutionError> {
    let mut index = HashMap::new();
    let entities: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![data],
        _ => return Ok(index),
    };

    'entities: for entity in entities {
        let Some(object) = entity.as_object() else {
            continue;
        };
        let mut parts = Vec::with_capacity(export_keys.len());
        for (alias, variable) in export_keys.iter().zip(key_variables) {
            match object.get(alias) {
                Some(value) => parts.push((variable.as_str(), value)),
                None => continue 'entities,
            }
        }
        let key = compose_key(parts)?;
        index.entry(key).or_insert(entity);
    }

    Ok(index)
}
