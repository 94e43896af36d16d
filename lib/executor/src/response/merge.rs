use serde_json::{Map, Value};

pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        // If the source value is null, we do nothing.
        (_, Value::Null) => {
            // No-op
        }

        // Both are Objects: merge them using the helper.
        (Value::Object(target_map), Value::Object(source_map)) => {
            deep_merge_objects(target_map, source_map);
        }

        // Both are Arrays: merge them element-wise.
        (Value::Array(target_arr), Value::Array(source_arr)) => {
            for (target_val, source_val) in target_arr.iter_mut().zip(source_arr) {
                deep_merge(target_val, source_val);
            }
        }

        // The types don't match, or the target is not a container.
        (target_val, source_val) => {
            *target_val = source_val;
        }
    }
}

fn deep_merge_objects(target_map: &mut Map<String, Value>, source_map: Map<String, Value>) {
    if target_map.is_empty() {
        *target_map = source_map;
        return;
    }

    for (key, source_val) in source_map {
        match target_map.get_mut(&key) {
            Some(target_val) => deep_merge(target_val, source_val),
            None => {
                target_map.insert(key, source_val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::deep_merge;

    #[test]
    fn merges_nested_objects() {
        let mut target = json!({ "me": { "id": "1", "reviews": [{ "id": "r1" }] } });
        deep_merge(
            &mut target,
            json!({ "me": { "username": "ada", "reviews": [{ "body": "great" }] } }),
        );

        assert_eq!(
            target,
            json!({
                "me": {
                    "id": "1",
                    "reviews": [{ "id": "r1", "body": "great" }],
                    "username": "ada"
                }
            })
        );
    }

    #[test]
    fn null_source_keeps_target() {
        let mut target = json!({ "name": "Table" });
        deep_merge(&mut target, json!(null));
        assert_eq!(target, json!({ "name": "Table" }));

        deep_merge(&mut target, json!({ "name": null, "price": null }));
        assert_eq!(target, json!({ "name": "Table", "price": null }));
    }

    #[test]
    fn scalar_source_replaces_target() {
        let mut target = json!({ "inStock": false });
        deep_merge(&mut target, json!({ "inStock": true }));
        assert_eq!(target, json!({ "inStock": true }));
    }
}
