use indexmap::{IndexMap, IndexSet};

use crate::ast::selection_set::{SelectionId, SelectionSet, SelectionSetId};
use crate::ast::type_node::TypeNode;
use crate::federation_metadata::ResolverDefinition;

pub type StepId = usize;

/// Required field name to the state variable that carries its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementBinding {
    pub arguments: IndexMap<String, String>,
}

/// One fetch against one subgraph, as seen by the planning stages.
#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub id: StepId,
    pub subgraph_name: String,
    /// The selection whose nested set this step resolves. `None` for root steps.
    pub parent_selection: Option<SelectionId>,
    pub parent_step: Option<StepId>,
    pub selection_set_id: SelectionSetId,
    pub type_name: String,
    pub resolver: Option<ResolverDefinition>,
    pub root_selections: Vec<SelectionId>,
    pub all_selections: IndexSet<SelectionId>,
    pub all_selection_sets: IndexSet<SelectionSetId>,
    pub selection_resolvers: IndexMap<SelectionId, RequirementBinding>,
    /// Request variable name to the state variable it is read from.
    pub variables: IndexMap<String, String>,
    pub argument_types: IndexMap<String, TypeNode>,
    pub requires: IndexSet<String>,
    pub provides: IndexSet<String>,
    pub dependencies: IndexSet<StepId>,
    /// Aliases of the key fields selected for batch matching, in `requires` order.
    pub export_keys: Vec<String>,
    /// State variables matched against `export_keys`, position by position.
    pub key_variables: Vec<String>,
    /// The subgraph side selection rooted at `selection_set_id`.
    pub selection_set: SelectionSet,
}

impl ExecutionStep {
    pub fn new(
        id: StepId,
        subgraph_name: impl Into<String>,
        selection_set_id: SelectionSetId,
        type_name: impl Into<String>,
    ) -> Self {
        let type_name = type_name.into();
        ExecutionStep {
            id,
            subgraph_name: subgraph_name.into(),
            parent_selection: None,
            parent_step: None,
            selection_set_id,
            selection_set: SelectionSet::new(selection_set_id, type_name.clone()),
            type_name,
            resolver: None,
            root_selections: vec![],
            all_selections: IndexSet::new(),
            all_selection_sets: IndexSet::from([selection_set_id]),
            selection_resolvers: IndexMap::new(),
            variables: IndexMap::new(),
            argument_types: IndexMap::new(),
            requires: IndexSet::new(),
            provides: IndexSet::new(),
            dependencies: IndexSet::new(),
            export_keys: vec![],
            key_variables: vec![],
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_step.is_none()
    }

    pub fn add_requirement(&mut self, variable: &str, variable_type: TypeNode) {
        self.requires.insert(variable.to_string());
        self.variables
            .entry(variable.to_string())
            .or_insert_with(|| variable.to_string());
        self.argument_types
            .entry(variable.to_string())
            .or_insert(variable_type);
    }
}
