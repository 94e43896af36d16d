use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::ast::selection_set::{SelectionSet, SelectionSetId};
use crate::ast::type_node::TypeNode;
use crate::planner::context::VariableExport;
use crate::utils::pretty_display::{get_indent, PrettyDisplay};

/// The immutable output of planning. Shared between requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    #[serde(skip)]
    pub operation: Arc<OperationDefinition>,
    pub root: ExecutionNode,
    /// State variables each selection set exports, with the alias they are fetched under.
    pub exports: IndexMap<SelectionSetId, Vec<VariableExport>>,
    /// Selection sets that are the target of at least one entity fetch.
    pub dependent_selection_sets: IndexSet<SelectionSetId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "node")]
pub enum ExecutionNode {
    Resolve(ResolveNode),
    ResolveByKeyBatch(ResolveByKeyBatchNode),
    Sequence(Vec<ExecutionNode>),
    Parallel(Vec<ExecutionNode>),
}

/// Everything a resolver node needs to issue its subgraph request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    pub subgraph_name: String,
    pub selection_set_id: SelectionSetId,
    pub type_name: String,
    pub operation_kind: OperationKind,
    pub document: String,
    /// Path from the response `data` to the entity data, e.g. `["productsByUpc"]`.
    pub path: Vec<String>,
    pub requires: Vec<String>,
    pub provides: Vec<String>,
    /// Operation variables referenced by this fetch and passed through as is.
    pub forwarded_variables: Vec<String>,
    pub argument_types: IndexMap<String, TypeNode>,
    #[serde(skip)]
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveNode {
    pub id: usize,
    pub config: ResolverConfig,
    pub nodes: Vec<ExecutionNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveByKeyBatchNode {
    pub id: usize,
    pub config: ResolverConfig,
    /// Aliases of the key fields in each returned entity, in `requires` order.
    pub export_keys: Vec<String>,
    /// State variables whose values are compared with `export_keys`.
    pub key_variables: Vec<String>,
    pub nodes: Vec<ExecutionNode>,
}

impl ExecutionNode {
    pub fn id(&self) -> Option<usize> {
        match self {
            ExecutionNode::Resolve(node) => Some(node.id),
            ExecutionNode::ResolveByKeyBatch(node) => Some(node.id),
            ExecutionNode::Sequence(_) | ExecutionNode::Parallel(_) => None,
        }
    }

    pub fn config(&self) -> Option<&ResolverConfig> {
        match self {
            ExecutionNode::Resolve(node) => Some(&node.config),
            ExecutionNode::ResolveByKeyBatch(node) => Some(&node.config),
            ExecutionNode::Sequence(_) | ExecutionNode::Parallel(_) => None,
        }
    }

    pub fn children(&self) -> &[ExecutionNode] {
        match self {
            ExecutionNode::Resolve(node) => &node.nodes,
            ExecutionNode::ResolveByKeyBatch(node) => &node.nodes,
            ExecutionNode::Sequence(nodes) | ExecutionNode::Parallel(nodes) => nodes,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<ExecutionNode> {
        match self {
            ExecutionNode::Resolve(node) => &mut node.nodes,
            ExecutionNode::ResolveByKeyBatch(node) => &mut node.nodes,
            ExecutionNode::Sequence(nodes) | ExecutionNode::Parallel(nodes) => nodes,
        }
    }

    /// Resolver nodes of this subtree, depth first.
    pub fn resolvers(&self) -> Vec<&ExecutionNode> {
        let mut out = vec![];
        self.collect_resolvers(&mut out);
        out
    }

    fn collect_resolvers<'a>(&'a self, out: &mut Vec<&'a ExecutionNode>) {
        if self.config().is_some() {
            out.push(self);
        }
        for child in self.children() {
            child.collect_resolvers(out);
        }
    }
}

impl QueryPlan {
    pub fn exports_for(&self, selection_set: SelectionSetId) -> &[VariableExport] {
        self.exports
            .get(&selection_set)
            .map(|exports| exports.as_slice())
            .unwrap_or_default()
    }

    pub fn has_dependent_nodes(&self, selection_set: SelectionSetId) -> bool {
        self.dependent_selection_sets.contains(&selection_set)
    }

    pub fn root_selection_set_id(&self) -> SelectionSetId {
        self.operation.selection_set.id
    }

    pub fn node_count(&self) -> usize {
        self.root.resolvers().len()
    }
}

impl Display for QueryPlan {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl Display for ExecutionNode {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl PrettyDisplay for QueryPlan {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}QueryPlan {{")?;
        self.root.pretty_fmt(f, depth + 1)?;
        writeln!(f, "{indent}}},")?;
        Ok(())
    }
}

fn fmt_resolver(
    f: &mut FmtFormatter<'_>,
    depth: usize,
    variant: &str,
    id: usize,
    config: &ResolverConfig,
    nodes: &[ExecutionNode],
) -> FmtResult {
    let indent = get_indent(depth);
    writeln!(
        f,
        "{indent}{variant}(id: {id}, service: \"{}\") {{",
        config.subgraph_name
    )?;
    if !config.provides.is_empty() {
        writeln!(f, "{indent}  provides: [{}]", config.provides.join(", "))?;
    }
    if !config.requires.is_empty() {
        writeln!(f, "{indent}  requires: [{}]", config.requires.join(", "))?;
    }
    if !config.path.is_empty() {
        writeln!(f, "{indent}  path: {}", config.path.join("."))?;
    }
    writeln!(f, "{indent}  {}", config.document)?;
    for node in nodes {
        node.pretty_fmt(f, depth + 1)?;
    }
    writeln!(f, "{indent}}},")?;

    Ok(())
}

impl PrettyDisplay for ExecutionNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        match self {
            ExecutionNode::Resolve(node) => {
                fmt_resolver(f, depth, "Resolve", node.id, &node.config, &node.nodes)
            }
            ExecutionNode::ResolveByKeyBatch(node) => fmt_resolver(
                f,
                depth,
                "ResolveByKeyBatch",
                node.id,
                &node.config,
                &node.nodes,
            ),
            ExecutionNode::Parallel(nodes) | ExecutionNode::Sequence(nodes) => {
                let indent = get_indent(depth);
                let variant = if matches!(self, ExecutionNode::Parallel(_)) {
                    "Parallel"
                } else {
                    "Sequence"
                };
                writeln!(f, "{indent}{variant} {{")?;
                for node in nodes {
                    node.pretty_fmt(f, depth + 1)?;
                }
                writeln!(f, "{indent}}},")?;
                Ok(())
            }
        }
    }
}
