use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::ast::operation::OperationDefinition;
use crate::ast::selection_set::{FieldSelection, SelectionId, SelectionSet, SelectionSetId};
use crate::federation_metadata::{FederationMetadata, ObjectTypeMetadata, ResolverKind};
use crate::planner::error::PlannerError;
use crate::planner::execution_step::{ExecutionStep, StepId};
use crate::planner::plan_nodes::ExecutionNode;

#[derive(Debug, Clone)]
pub struct SelectionSetInfo {
    pub type_name: String,
    pub parent_selection: Option<SelectionId>,
    /// True when a list type appears anywhere on the path from the root.
    pub is_plural: bool,
}

/// A state variable fetched under an internal alias for dependent fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableExport {
    pub variable: String,
    pub alias: String,
    #[serde(skip)]
    pub provider: StepId,
}

/// Mutable state shared by the planning stages for one operation.
pub struct PlanningContext<'a> {
    pub metadata: &'a FederationMetadata,
    pub operation: OperationDefinition,
    pub selection_sets: HashMap<SelectionSetId, SelectionSetInfo>,
    pub steps: Vec<ExecutionStep>,
    pub exports: IndexMap<SelectionSetId, Vec<VariableExport>>,
    pub dependent_selection_sets: IndexSet<SelectionSetId>,
    pub nodes: Vec<Option<ExecutionNode>>,
    pub root: Option<ExecutionNode>,
    next_selection_id: usize,
    next_export_id: usize,
}

impl<'a> PlanningContext<'a> {
    pub fn new(metadata: &'a FederationMetadata, operation: &OperationDefinition) -> Self {
        let mut selection_sets = HashMap::new();
        let mut max_selection_id = 0;
        index_selection_set(
            &operation.selection_set,
            None,
            false,
            &mut selection_sets,
            &mut max_selection_id,
        );

        PlanningContext {
            metadata,
            operation: operation.clone(),
            selection_sets,
            steps: vec![],
            exports: IndexMap::new(),
            dependent_selection_sets: IndexSet::new(),
            nodes: vec![],
            root: None,
            next_selection_id: max_selection_id + 1,
            next_export_id: 0,
        }
    }

    pub fn type_metadata(&self, type_name: &str) -> Result<&'a ObjectTypeMetadata, PlannerError> {
        self.metadata
            .get_type(type_name)
            .ok_or_else(|| PlannerError::UnknownType(type_name.to_string()))
    }

    pub fn selection_set_info(&self, id: SelectionSetId) -> Result<&SelectionSetInfo, PlannerError> {
        self.selection_sets
            .get(&id)
            .ok_or(PlannerError::MissingSelectionSet(id))
    }

    /// Ids for selections the planner injects; they never collide with operation ids.
    pub fn next_selection_id(&mut self) -> SelectionId {
        let id = SelectionId(self.next_selection_id);
        self.next_selection_id += 1;
        id
    }

    pub fn add_step(&mut self, mut step: ExecutionStep) -> StepId {
        let id = self.steps.len();
        step.id = id;
        self.steps.push(step);
        id
    }

    /// True when `step` waits, directly or transitively, on `other`.
    pub fn depends_on(&self, step: StepId, other: StepId) -> bool {
        let mut stack: Vec<StepId> = self.steps[step].dependencies.iter().copied().collect();
        let mut seen = vec![false; self.steps.len()];

        while let Some(current) = stack.pop() {
            if current == other {
                return true;
            }
            if std::mem::replace(&mut seen[current], true) {
                continue;
            }
            stack.extend(self.steps[current].dependencies.iter().copied());
        }

        false
    }

    pub fn find_export(&self, selection_set: SelectionSetId, variable: &str) -> Option<&VariableExport> {
        self.exports
            .get(&selection_set)
            .and_then(|exports| exports.iter().find(|e| e.variable == variable))
    }

    /// Creates a step that fetches part of `selection_set` from `subgraph`
    /// through one of its entity resolvers.
    pub fn create_entity_step(
        &mut self,
        subgraph: &str,
        parent_step: StepId,
        selection_set: SelectionSetId,
        prefer_batch: bool,
    ) -> Result<StepId, PlannerError> {
        let info = self.selection_set_info(selection_set)?;
        let parent_selection = info.parent_selection;
        let type_name = info.type_name.clone();
        let type_metadata = self.type_metadata(&type_name)?;

        let preferred = if prefer_batch {
            ResolverKind::Batch
        } else {
            ResolverKind::Fetch
        };
        let resolver = type_metadata
            .resolver(subgraph, preferred)
            .ok_or_else(|| PlannerError::NoEntityResolver {
                type_name: type_name.clone(),
                subgraph: subgraph.to_string(),
            })?
            .clone();

        let mut step = ExecutionStep::new(0, subgraph, selection_set, type_name);
        step.parent_step = Some(parent_step);
        step.parent_selection = parent_selection;
        step.resolver = Some(resolver);
        step.dependencies.insert(parent_step);

        Ok(self.add_step(step))
    }

    /// Makes sure some step that runs before `consumer` fetches `field_name`
    /// of the consumer's entity and exports it as `variable`. Returns the
    /// providing step, which `consumer` now depends on.
    pub fn ensure_provider(
        &mut self,
        consumer: StepId,
        field_name: &str,
        variable: &str,
        allow_create: bool,
    ) -> Result<StepId, PlannerError> {
        let selection_set = self.steps[consumer].selection_set_id;
        let type_name = self.steps[consumer].type_name.clone();
        let type_metadata = self.type_metadata(&type_name)?;
        let field_metadata =
            type_metadata
                .field(field_name)
                .ok_or_else(|| PlannerError::UnknownField {
                    type_name: type_name.clone(),
                    field_name: field_name.to_string(),
                })?;

        if self
            .metadata
            .is_object_type(field_metadata.field_type.inner_type())
        {
            return Err(PlannerError::UnsupportedRequirement {
                type_name,
                field_name: field_name.to_string(),
            });
        }

        if let Some(export) = self.find_export(selection_set, variable) {
            let provider = export.provider;
            if provider != consumer && !self.depends_on(provider, consumer) {
                self.steps[consumer].dependencies.insert(provider);
                return Ok(provider);
            }
        }

        let unresolvable = || PlannerError::UnresolvableRequirement {
            type_name: type_name.clone(),
            field_name: field_name.to_string(),
            subgraph: self.steps[consumer].subgraph_name.clone(),
        };

        let parent = self.steps[consumer].parent_step.ok_or_else(unresolvable)?;
        let flags = type_metadata.field_flags(field_name).unwrap_or_default();

        let provider = if field_metadata.is_resolvable_in(flags, &self.steps[parent].subgraph_name)
        {
            Some(parent)
        } else {
            self.steps
                .iter()
                .find(|s| {
                    s.id != consumer
                        && s.selection_set_id == selection_set
                        && s.parent_step == Some(parent)
                        && field_metadata.is_resolvable_in(flags, &s.subgraph_name)
                        && !self.depends_on(s.id, consumer)
                })
                .map(|s| s.id)
        };

        let provider = match provider {
            Some(provider) => provider,
            None if allow_create => {
                let prefer_batch = self.selection_set_info(selection_set)?.is_plural;
                self.create_entity_step(&field_metadata.owner, parent, selection_set, prefer_batch)?
            }
            None => return Err(unresolvable()),
        };

        self.add_export(provider, selection_set, field_name, variable)?;
        self.steps[consumer].dependencies.insert(provider);

        Ok(provider)
    }

    fn add_export(
        &mut self,
        provider: StepId,
        selection_set: SelectionSetId,
        field_name: &str,
        variable: &str,
    ) -> Result<(), PlannerError> {
        let type_name = self.selection_set_info(selection_set)?.type_name.clone();
        let type_metadata = self.type_metadata(&type_name)?;
        let field_metadata =
            type_metadata
                .field(field_name)
                .ok_or_else(|| PlannerError::UnknownField {
                    type_name: type_name.clone(),
                    field_name: field_name.to_string(),
                })?;

        let alias = format!("_internal_export_{}", self.next_export_id);
        self.next_export_id += 1;
        let id = self.next_selection_id();

        let target = self.steps[provider]
            .selection_set
            .find_selection_set_mut(selection_set)
            .ok_or(PlannerError::MissingSelectionSet(selection_set))?;
        target.items.push(FieldSelection {
            id,
            name: field_name.to_string(),
            alias: Some(alias.clone()),
            arguments: vec![],
            field_type: field_metadata.field_type.clone(),
            selection_set: None,
            flags: type_metadata.field_flags(field_name).unwrap_or_default(),
        });
        self.steps[provider].provides.insert(variable.to_string());

        self.exports
            .entry(selection_set)
            .or_default()
            .push(VariableExport {
                variable: variable.to_string(),
                alias,
                provider,
            });

        Ok(())
    }
}

fn index_selection_set(
    selection_set: &SelectionSet,
    parent_selection: Option<SelectionId>,
    is_plural: bool,
    index: &mut HashMap<SelectionSetId, SelectionSetInfo>,
    max_selection_id: &mut usize,
) {
    index.insert(
        selection_set.id,
        SelectionSetInfo {
            type_name: selection_set.type_name.clone(),
            parent_selection,
            is_plural,
        },
    );

    for field in &selection_set.items {
        *max_selection_id = (*max_selection_id).max(field.id.0);
        if let Some(child) = &field.selection_set {
            index_selection_set(
                child,
                Some(field.id),
                is_plural || field.field_type.is_list(),
                index,
                max_selection_id,
            );
        }
    }
}
