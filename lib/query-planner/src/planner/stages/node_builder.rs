use tracing::{instrument, trace};

use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::federation_metadata::ResolverKind;
use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;
use crate::planner::execution_step::ExecutionStep;
use crate::planner::plan_nodes::{
    ExecutionNode, ResolveByKeyBatchNode, ResolveNode, ResolverConfig,
};
use crate::planner::stages::PlanningStage;

/// Turns every step into a resolver node with a rendered request document.
pub struct NodeBuilderStage;

impl PlanningStage for NodeBuilderStage {
    fn name(&self) -> &'static str {
        "node_builder"
    }

    #[instrument(level = "trace", skip_all)]
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        let mut nodes = Vec::with_capacity(ctx.steps.len());

        for step in &ctx.steps {
            let config = build_resolver_config(&ctx.operation, step)?;
            trace!(step = step.id, document = %config.document, "built resolver node");

            let is_batch = step
                .resolver
                .as_ref()
                .is_some_and(|resolver| resolver.kind == ResolverKind::Batch);

            let node = if is_batch {
                ExecutionNode::ResolveByKeyBatch(ResolveByKeyBatchNode {
                    id: step.id,
                    config,
                    export_keys: step.export_keys.clone(),
                    key_variables: step.key_variables.clone(),
                    nodes: vec![],
                })
            } else {
                ExecutionNode::Resolve(ResolveNode {
                    id: step.id,
                    config,
                    nodes: vec![],
                })
            };
            nodes.push(Some(node));
        }

        ctx.nodes = nodes;
        Ok(())
    }
}

fn build_resolver_config(
    operation: &OperationDefinition,
    step: &ExecutionStep,
) -> Result<ResolverConfig, PlannerError> {
    let mut used = vec![];
    step.selection_set.collect_variables(&mut used);
    let forwarded_variables: Vec<String> = used
        .into_iter()
        .filter(|name| !step.variables.contains_key(*name))
        .map(String::from)
        .collect();

    let mut definitions: Vec<String> = step
        .requires
        .iter()
        .filter_map(|variable| {
            step.argument_types
                .get(variable)
                .map(|variable_type| format!("${}: {}", variable, variable_type))
        })
        .collect();
    for name in &forwarded_variables {
        let definition = operation
            .variable_definition(name)
            .ok_or_else(|| PlannerError::UndefinedVariable(name.clone()))?;
        definitions.push(definition.to_string());
    }

    let operation_kind = if step.is_root() {
        operation.operation_kind
    } else {
        OperationKind::Query
    };

    let mut document = operation_kind.to_string();
    if !definitions.is_empty() {
        document.push('(');
        document.push_str(&definitions.join(", "));
        document.push(')');
    }
    document.push(' ');

    let path = match &step.resolver {
        Some(resolver) => {
            let arguments = resolver
                .arguments
                .iter()
                .map(|argument| format!("{}: ${}", argument.name, argument.variable))
                .collect::<Vec<_>>()
                .join(", ");
            document.push_str("{ ");
            document.push_str(&resolver.field);
            if !arguments.is_empty() {
                document.push('(');
                document.push_str(&arguments);
                document.push(')');
            }
            document.push(' ');
            document.push_str(&step.selection_set.to_string());
            document.push_str(" }");
            vec![resolver.field.clone()]
        }
        None => {
            document.push_str(&step.selection_set.to_string());
            vec![]
        }
    };

    Ok(ResolverConfig {
        subgraph_name: step.subgraph_name.clone(),
        selection_set_id: step.selection_set_id,
        type_name: step.type_name.clone(),
        operation_kind,
        document,
        path,
        requires: step.requires.iter().cloned().collect(),
        provides: step.provides.iter().cloned().collect(),
        forwarded_variables,
        argument_types: step.argument_types.clone(),
        selection_set: step.selection_set.clone(),
    })
}
