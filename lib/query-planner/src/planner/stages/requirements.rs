use tracing::{instrument, trace};

use crate::ast::selection_set::FieldSelection;
use crate::federation_metadata::ResolverKind;
use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;
use crate::planner::stages::PlanningStage;

/// Adds the entity key variables of every resolver to the step's `requires`
/// and makes sure an ancestor fetch exports them.
pub struct RequirementsStage;

impl PlanningStage for RequirementsStage {
    fn name(&self) -> &'static str {
        "requirements"
    }

    #[instrument(level = "trace", skip_all)]
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        for step_id in 0..ctx.steps.len() {
            let Some(resolver) = ctx.steps[step_id].resolver.clone() else {
                continue;
            };

            let type_name = ctx.steps[step_id].type_name.clone();
            let type_metadata = ctx.type_metadata(&type_name)?;

            for argument in &resolver.arguments {
                let state_variable = type_metadata.variable(&argument.variable).ok_or_else(|| {
                    PlannerError::InvalidConfiguration(format!(
                        "resolver \"{}\" binds undeclared variable \"{}\"",
                        resolver.field, argument.variable
                    ))
                })?;

                let provider =
                    ctx.ensure_provider(step_id, &state_variable.field, &argument.variable, false)?;
                trace!(
                    step = step_id,
                    provider = provider,
                    variable = %argument.variable,
                    "bound resolver key"
                );

                ctx.steps[step_id].add_requirement(&argument.variable, argument.argument_type.clone());
            }

            if resolver.kind != ResolverKind::Batch {
                continue;
            }

            // Batched entities are matched back by the key fields they echo.
            // Values bound from field requirements are sent, never echoed.
            for (index, argument) in resolver.arguments.iter().enumerate() {
                let Some(state_variable) = type_metadata.variable(&argument.variable) else {
                    continue;
                };
                let Some(field_metadata) = type_metadata.field(&state_variable.field) else {
                    continue;
                };

                let alias = format!("_internal_key_{}", index);
                let id = ctx.next_selection_id();
                let step = &mut ctx.steps[step_id];
                step.selection_set.items.push(FieldSelection {
                    id,
                    name: state_variable.field.clone(),
                    alias: Some(alias.clone()),
                    arguments: vec![],
                    field_type: field_metadata.field_type.clone(),
                    selection_set: None,
                    flags: type_metadata
                        .field_flags(&state_variable.field)
                        .unwrap_or_default(),
                });
                step.export_keys.push(alias);
                step.key_variables.push(argument.variable.clone());
            }
        }

        Ok(())
    }
}
