use indexmap::IndexMap;
use tracing::{instrument, trace};

use crate::ast::operation::OperationKind;
use crate::ast::selection_set::{FieldSelection, SelectionSet};
use crate::federation_metadata::field_flags::FieldFlags;
use crate::field_flags_optimizer::FieldFlagsOptimizer;
use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;
use crate::planner::execution_step::{ExecutionStep, StepId};
use crate::planner::stages::PlanningStage;

/// Partitions the operation into steps: root fields grouped by owning
/// subgraph, nested fields kept with the current step when its subgraph can
/// resolve them and moved to dependent entity steps otherwise.
pub struct StepDiscoveryStage;

impl PlanningStage for StepDiscoveryStage {
    fn name(&self) -> &'static str {
        "step_discovery"
    }

    #[instrument(level = "trace", skip_all)]
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        FieldFlagsOptimizer::optimize_operation(&mut ctx.operation, ctx.metadata);

        let root = ctx.operation.selection_set.clone();
        let root_type = ctx.type_metadata(&root.type_name)?;
        let is_mutation = ctx.operation.operation_kind == OperationKind::Mutation;
        let mut root_steps: Vec<StepId> = vec![];

        for field in &root.items {
            if field.is_introspection() {
                continue;
            }

            let field_metadata =
                root_type
                    .field(&field.name)
                    .ok_or_else(|| PlannerError::UnknownField {
                        type_name: root.type_name.clone(),
                        field_name: field.name.clone(),
                    })?;

            // Mutation fields run in document order, so only the previous
            // step can take the next field.
            let reusable = if is_mutation {
                root_steps.last().copied().filter(|id| {
                    field_metadata.is_resolvable_in(field.flags, &ctx.steps[*id].subgraph_name)
                })
            } else {
                root_steps.iter().copied().find(|id| {
                    field_metadata.is_resolvable_in(field.flags, &ctx.steps[*id].subgraph_name)
                })
            };

            let step_id = match reusable {
                Some(id) => id,
                None => {
                    let step = ExecutionStep::new(
                        0,
                        field_metadata.owner.as_str(),
                        root.id,
                        root.type_name.as_str(),
                    );
                    let id = ctx.add_step(step);
                    trace!(step = id, subgraph = %field_metadata.owner, "created root step");
                    root_steps.push(id);
                    id
                }
            };

            ctx.steps[step_id].root_selections.push(field.id);
            let planned = collect_field(ctx, step_id, field)?;
            ctx.steps[step_id].selection_set.items.push(planned);
        }

        Ok(())
    }
}

fn collect_field(
    ctx: &mut PlanningContext<'_>,
    step_id: StepId,
    field: &FieldSelection,
) -> Result<FieldSelection, PlannerError> {
    ctx.steps[step_id].all_selections.insert(field.id);

    let selection_set = match &field.selection_set {
        Some(nested) => Some(collect_selection_set(ctx, step_id, nested)?),
        None => None,
    };

    Ok(FieldSelection {
        id: field.id,
        name: field.name.clone(),
        alias: field.alias.clone(),
        arguments: field.arguments.clone(),
        field_type: field.field_type.clone(),
        selection_set,
        flags: field.flags,
    })
}

fn collect_selection_set(
    ctx: &mut PlanningContext<'_>,
    step_id: StepId,
    selection_set: &SelectionSet,
) -> Result<SelectionSet, PlannerError> {
    ctx.steps[step_id]
        .all_selection_sets
        .insert(selection_set.id);

    let subgraph = ctx.steps[step_id].subgraph_name.clone();
    let type_metadata = ctx.type_metadata(&selection_set.type_name)?;
    let mut planned = SelectionSet::new(selection_set.id, selection_set.type_name.as_str());
    let mut leftovers: IndexMap<&str, Vec<&FieldSelection>> = IndexMap::new();

    for field in &selection_set.items {
        if field.is_introspection() {
            planned.items.push(field.clone());
            continue;
        }

        let field_metadata =
            type_metadata
                .field(&field.name)
                .ok_or_else(|| PlannerError::UnknownField {
                    type_name: selection_set.type_name.clone(),
                    field_name: field.name.clone(),
                })?;

        // Required values are passed in by a dependent fetch, never resolved in place.
        if !field.flags.contains(FieldFlags::REQUIRES)
            && field_metadata.is_resolvable_in(field.flags, &subgraph)
        {
            planned.items.push(collect_field(ctx, step_id, field)?);
        } else {
            leftovers
                .entry(field_metadata.owner.as_str())
                .or_default()
                .push(field);
        }
    }

    // Under a list every entity step is batched. Required values join the batch key.
    let prefer_batch = ctx.selection_set_info(selection_set.id)?.is_plural;
    for (owner, fields) in leftovers {
        let child = ctx.create_entity_step(owner, step_id, selection_set.id, prefer_batch)?;
        trace!(
            step = child,
            parent = step_id,
            subgraph = owner,
            type_name = %selection_set.type_name,
            "created entity step"
        );

        for field in fields {
            ctx.steps[child].root_selections.push(field.id);
            let planned_child = collect_field(ctx, child, field)?;
            ctx.steps[child].selection_set.items.push(planned_child);
        }
    }

    Ok(planned)
}
