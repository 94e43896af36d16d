use std::collections::HashSet;

use fusion_query_planner::ast::type_node::TypeNode;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::execution::{
    error::PlanExecutionError,
    keys::compose_key,
    state::{RequestState, StateId},
};

/// One entity taking part in a batched fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchExecutionState {
    /// Composed from the values sent to the subgraph. Drives deduplication.
    pub key: String,
    /// Composed from the values the returned entities are matched on.
    pub match_key: String,
    pub state_id: StateId,
}

/// Builds batch entries for every state that holds all required variables.
/// States missing a variable are skipped.
pub fn create_batch_states(
    request_state: &RequestState,
    state_ids: &[StateId],
    requires: &[String],
    key_variables: &[String],
) -> Result<Vec<BatchExecutionState>, PlanExecutionError> {
    let mut batch = Vec::with_capacity(state_ids.len());

    for state_id in state_ids {
        let state = request_state.get(*state_id);
        if !state.has_variables(requires) || !state.has_variables(key_variables) {
            trace!(
                state = state_id,
                "entity lacks a required variable, skipping it"
            );
            continue;
        }

        let values = &state.variable_values;
        let key = compose_key(
            requires
                .iter()
                .filter_map(|name| values.get(name).map(|value| (name.as_str(), value))),
        )?;
        let match_key = if key_variables == requires {
            key.clone()
        } else {
            compose_key(
                key_variables
                    .iter()
                    .filter_map(|name| values.get(name).map(|value| (name.as_str(), value))),
            )?
        };

        batch.push(BatchExecutionState {
            key,
            match_key,
            state_id: *state_id,
        });
    }

    Ok(batch)
}

/// Groups batch entries by key. Groups and their members keep first-seen order.
pub fn group_by_key(batch: &[BatchExecutionState]) -> IndexMap<&str, Vec<StateId>> {
    let mut groups: IndexMap<&str, Vec<StateId>> = IndexMap::new();
    for entry in batch {
        groups.entry(entry.key.as_str()).or_default().push(entry.state_id);
    }
    groups
}

/// Positions in `batch` of the first entry for every distinct key.
pub fn unique_batch_states(batch: &[BatchExecutionState]) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .iter()
        .enumerate()
        .filter(|(_, entry)| seen.insert(entry.key.as_str()))
        .map(|(position, _)| position)
        .collect()
}

/// Request variables for one batched call.
///
/// List arguments receive the values of the unique entities in order.
/// Scalar arguments receive the first unique entity's value.
pub fn build_batch_variables(
    request_state: &RequestState,
    batch: &[BatchExecutionState],
    unique: &[usize],
    requires: &[String],
    argument_types: &IndexMap<String, TypeNode>,
) -> Map<String, Value> {
    let mut variables = Map::new();

    for variable in requires {
        let values: Vec<&Value> = unique
            .iter()
            .filter_map(|position| {
                request_state
                    .get(batch[*position].state_id)
                    .variable_values
                    .get(variable)
            })
            .collect();

        let is_list = argument_types
            .get(variable)
            .is_some_and(|argument_type| argument_type.is_list());

        if is_list {
            variables.insert(
                variable.clone(),
                Value::Array(values.into_iter().cloned().collect()),
            );
            continue;
        }

        let Some(first) = values.first() else {
            continue;
        };
        if values.iter().any(|value| value != first) {
            warn!(
                variable = %variable,
                entities = values.len(),
                "batched entities disagree on a scalar argument, using the first entity's value"
            );
        }
        variables.insert(variable.clone(), (*first).clone());
    }

    variables
}

#[cfg(test)]
mod tests {
    use fusion_query_planner::ast::{selection_set::SelectionSetId, type_node::TypeNode};
    use indexmap::IndexMap;
    use serde_json::{json, Value};

    use super::{build_batch_variables, create_batch_states, group_by_key, unique_batch_states};
    use crate::execution::{
        error::PlanExecutionError,
        state::{RequestState, StateId},
    };
    use crate::response::path::PathSegment;

    fn seed(values: &[Value]) -> (RequestState, Vec<StateId>) {
        let mut state = RequestState::new();
        let ids = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let id = state.get_or_create(
                    SelectionSetId(1),
                    &[PathSegment::field("items"), PathSegment::Index(index)],
                    &[],
                );
                if !value.is_null() {
                    state
                        .get_mut(id)
                        .variable_values
                        .insert("Product_upc".to_string(), value.clone());
                }
                id
            })
            .collect();
        (state, ids)
    }

    fn upc() -> Vec<String> {
        vec!["Product_upc".to_string()]
    }

    fn list_argument() -> IndexMap<String, TypeNode> {
        let mut types = IndexMap::new();
        types.insert(
            "Product_upc".to_string(),
            "[ID!]!".parse().expect("valid type"),
        );
        types
    }

    #[test]
    fn identical_keys_collapse_to_one_value() {
        let (state, ids) = seed(&[json!("1"), json!("2"), json!("1"), json!("2")]);
        let batch = create_batch_states(&state, &ids, &upc(), &upc()).unwrap();
        let unique = unique_batch_states(&batch);

        assert_eq!(unique, vec![0, 1]);
        let variables = build_batch_variables(&state, &batch, &unique, &upc(), &list_argument());
        assert_eq!(Value::Object(variables), json!({ "Product_upc": ["1", "2"] }));
    }

    #[test]
    fn groups_partition_all_entities() {
        let (state, ids) = seed(&[json!("1"), json!(2), json!("1"), json!(true)]);
        let batch = create_batch_states(&state, &ids, &upc(), &upc()).unwrap();
        let groups = group_by_key(&batch);

        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["1", "2", "true"]);
        assert_eq!(groups["1"], vec![ids[0], ids[2]]);

        let mut members: Vec<StateId> = groups.values().flatten().copied().collect();
        members.sort();
        assert_eq!(members, ids);
    }

    #[test]
    fn entities_without_key_are_skipped() {
        let (state, ids) = seed(&[json!("1"), json!(null)]);
        let batch = create_batch_states(&state, &ids, &upc(), &upc()).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].state_id, ids[0]);
    }

    #[test]
    fn object_keys_fail_the_batch() {
        let (state, ids) = seed(&[json!("1"), json!({ "upc": "2" })]);
        let result = create_batch_states(&state, &ids, &upc(), &upc());

        assert_eq!(
            result,
            Err(PlanExecutionError::UnsupportedKeyValue {
                variable: "Product_upc".to_string(),
                kind: "object",
            })
        );
    }

    #[test]
    fn scalar_argument_uses_first_entity() {
        let (state, ids) = seed(&[json!("1"), json!("2")]);
        let batch = create_batch_states(&state, &ids, &upc(), &upc()).unwrap();
        let unique = unique_batch_states(&batch);

        let mut scalar = IndexMap::new();
        scalar.insert("Product_upc".to_string(), "ID!".parse().expect("valid type"));
        let variables = build_batch_variables(&state, &batch, &unique, &upc(), &scalar);

        assert_eq!(Value::Object(variables), json!({ "Product_upc": "1" }));
    }
}
