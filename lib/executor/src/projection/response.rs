use fusion_query_planner::ast::{operation::OperationDefinition, selection_set::SelectionSet};
use serde_json::{Map, Value};

const TYPENAME_FIELD_NAME: &str = "__typename";

/// Shapes the merged data by the client operation.
///
/// Fields appear in operation order, fields nobody resolved become `null`
/// and planner-internal fields are dropped.
pub fn project_by_operation(data: &Value, operation: &OperationDefinition) -> Value {
    match data {
        Value::Object(object) => project_object(object, &operation.selection_set),
        _ => Value::Null,
    }
}

fn project_selection_set(value: &Value, selection_set: &SelectionSet) -> Value {
    match value {
        Value::Object(object) => project_object(object, selection_set),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project_selection_set(item, selection_set))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn project_object(object: &Map<String, Value>, selection_set: &SelectionSet) -> Value {
    let mut projected = Map::with_capacity(selection_set.items.len());

    for field in &selection_set.items {
        let response_name = field.response_name();
        let value = match (object.get(response_name), &field.selection_set) {
            (Some(value), Some(child)) => project_selection_set(value, child),
            (Some(value), None) => value.clone(),
            (None, _) if field.name == TYPENAME_FIELD_NAME => {
                Value::String(selection_set.type_name.clone())
            }
            (None, _) => Value::Null,
        };
        projected.insert(response_name.to_string(), value);
    }

    Value::Object(projected)
}
