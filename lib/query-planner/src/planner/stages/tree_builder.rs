use indexmap::IndexSet;
use tracing::instrument;

use crate::ast::operation::OperationKind;
use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;
use crate::planner::execution_step::StepId;
use crate::planner::plan_nodes::ExecutionNode;
use crate::planner::stages::PlanningStage;

/// Hangs every node under the node of its deepest dependency and wraps the
/// roots in `Parallel` for queries or `Sequence` for mutations.
pub struct TreeBuilderStage;

impl PlanningStage for TreeBuilderStage {
    fn name(&self) -> &'static str {
        "tree_builder"
    }

    #[instrument(level = "trace", skip_all)]
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        let count = ctx.steps.len();
        let mut depths: Vec<Option<usize>> = vec![None; count];
        let mut visiting = vec![false; count];
        for id in 0..count {
            depth_of(ctx, id, &mut depths, &mut visiting)?;
        }

        let mut children: Vec<Vec<StepId>> = vec![vec![]; count];
        let mut roots = vec![];
        let mut dependent_selection_sets = IndexSet::new();

        for step in &ctx.steps {
            let Some(parent) = step
                .dependencies
                .iter()
                .copied()
                .max_by_key(|dependency| depths[*dependency])
            else {
                roots.push(step.id);
                continue;
            };

            let is_chain = step
                .dependencies
                .iter()
                .all(|dependency| *dependency == parent || ctx.depends_on(parent, *dependency));
            if !is_chain {
                return Err(PlannerError::CyclicDependency(step.id));
            }

            children[parent].push(step.id);
            dependent_selection_sets.insert(step.selection_set_id);
        }

        let mut nodes = std::mem::take(&mut ctx.nodes);
        let mut root_nodes = roots
            .into_iter()
            .map(|id| assemble(id, &children, &mut nodes))
            .collect::<Result<Vec<_>, _>>()?;

        let root = if root_nodes.len() == 1 {
            root_nodes.pop().ok_or(PlannerError::EmptyPlan)?
        } else {
            match ctx.operation.operation_kind {
                OperationKind::Query => ExecutionNode::Parallel(root_nodes),
                OperationKind::Mutation => ExecutionNode::Sequence(root_nodes),
            }
        };

        ctx.root = Some(root);
        ctx.dependent_selection_sets = dependent_selection_sets;

        Ok(())
    }
}

fn depth_of(
    ctx: &PlanningContext<'_>,
    id: StepId,
    depths: &mut [Option<usize>],
    visiting: &mut [bool],
) -> Result<usize, PlannerError> {
    if let Some(depth) = depths[id] {
        return Ok(depth);
    }
    if visiting[id] {
        return Err(PlannerError::CyclicDependency(id));
    }

    visiting[id] = true;
    let mut depth = 0;
    for dependency in &ctx.steps[id].dependencies {
        depth = depth.max(depth_of(ctx, *dependency, depths, visiting)? + 1);
    }
    visiting[id] = false;
    depths[id] = Some(depth);

    Ok(depth)
}

fn assemble(
    id: StepId,
    children: &[Vec<StepId>],
    nodes: &mut [Option<ExecutionNode>],
) -> Result<ExecutionNode, PlannerError> {
    let mut node = nodes
        .get_mut(id)
        .and_then(Option::take)
        .ok_or(PlannerError::MissingNode(id))?;

    for child in &children[id] {
        let child_node = assemble(*child, children, nodes)?;
        node.children_mut().push(child_node);
    }

    Ok(node)
}
