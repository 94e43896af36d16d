use std::collections::HashMap;

use fusion_query_planner::ast::selection_set::SelectionSetId;
use fusion_query_planner::planner::context::VariableExport;
use serde_json::{Map, Value};

use crate::response::path::PathSegment;

pub type StateId = usize;

/// Variables gathered for one entity that later resolver nodes consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    pub selection_set_id: SelectionSetId,
    pub path: Vec<PathSegment>,
    pub variable_values: Map<String, Value>,
    pub provides: Vec<String>,
}

impl ExecutionState {
    pub fn has_variables(&self, variables: &[String]) -> bool {
        variables
            .iter()
            .all(|variable| self.variable_values.contains_key(variable))
    }
}

/// Per-request arena of execution states, keyed by selection set and entity path.
#[derive(Debug, Default)]
pub struct RequestState {
    states: Vec<ExecutionState>,
    by_selection_set: HashMap<SelectionSetId, Vec<StateId>>,
    by_location: HashMap<(SelectionSetId, Vec<PathSegment>), StateId>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        selection_set_id: SelectionSetId,
        path: &[PathSegment],
        exports: &[VariableExport],
    ) -> StateId {
        if let Some(existing) = self.by_location.get(&(selection_set_id, path.to_vec())) {
            return *existing;
        }

        let id = self.states.len();
        self.states.push(ExecutionState {
            selection_set_id,
            path: path.to_vec(),
            variable_values: Map::new(),
            provides: exports
                .iter()
                .map(|export| export.variable.clone())
                .collect(),
        });
        self.by_selection_set
            .entry(selection_set_id)
            .or_default()
            .push(id);
        self.by_location.insert((selection_set_id, path.to_vec()), id);
        id
    }

    pub fn get(&self, id: StateId) -> &ExecutionState {
        &self.states[id]
    }

    pub fn get_mut(&mut self, id: StateId) -> &mut ExecutionState {
        &mut self.states[id]
    }

    /// States for a selection set in creation order, which follows response order.
    pub fn state_ids(&self, selection_set_id: SelectionSetId) -> &[StateId] {
        self.by_selection_set
            .get(&selection_set_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn teardown(&mut self) {
        self.states.clear();
        self.by_selection_set.clear();
        self.by_location.clear();
    }
}
