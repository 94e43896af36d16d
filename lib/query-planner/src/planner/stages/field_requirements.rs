use tracing::{instrument, trace};

use crate::ast::value::Value;
use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;
use crate::planner::execution_step::RequirementBinding;
use crate::planner::stages::PlanningStage;

/// Binds the fields required by `requires` fields to state variables and
/// makes an earlier fetch export them.
pub struct FieldRequirementsStage;

impl PlanningStage for FieldRequirementsStage {
    fn name(&self) -> &'static str {
        "field_requirements"
    }

    #[instrument(level = "trace", skip_all)]
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        // Steps created while providing requirements only carry exports.
        let step_count = ctx.steps.len();

        for step_id in 0..step_count {
            if ctx.steps[step_id].is_root() {
                continue;
            }

            let type_name = ctx.steps[step_id].type_name.clone();
            let type_metadata = ctx.type_metadata(&type_name)?;
            let root_selections = ctx.steps[step_id].root_selections.clone();

            for selection_id in root_selections {
                let Some(field_name) = ctx.steps[step_id]
                    .selection_set
                    .items
                    .iter()
                    .find(|f| f.id == selection_id)
                    .map(|f| f.name.clone())
                else {
                    continue;
                };
                let Some(field_metadata) = type_metadata.field(&field_name) else {
                    continue;
                };
                if field_metadata.requires.is_empty() {
                    continue;
                }

                let mut binding = RequirementBinding::default();
                for required in &field_metadata.requires {
                    let variable = type_metadata
                        .variable_for_field(required)
                        .map(|v| v.name.clone())
                        .unwrap_or_else(|| format!("{}_{}", type_name, required));
                    let required_type = type_metadata
                        .field(required)
                        .map(|f| f.field_type.clone())
                        .ok_or_else(|| PlannerError::UnknownField {
                            type_name: type_name.clone(),
                            field_name: required.clone(),
                        })?;

                    let provider = ctx.ensure_provider(step_id, required, &variable, true)?;
                    trace!(
                        step = step_id,
                        provider = provider,
                        variable = %variable,
                        "bound field requirement"
                    );

                    ctx.steps[step_id].add_requirement(&variable, required_type);
                    binding.arguments.insert(required.clone(), variable);
                }

                let step = &mut ctx.steps[step_id];
                if let Some(field) = step
                    .selection_set
                    .items
                    .iter_mut()
                    .find(|f| f.id == selection_id)
                {
                    for (argument, variable) in &binding.arguments {
                        field
                            .arguments
                            .push((argument.clone(), Value::Variable(variable.clone())));
                    }
                }
                step.selection_resolvers.insert(selection_id, binding);
            }
        }

        Ok(())
    }
}
