use crate::ast::selection_set::SelectionSetId;
use crate::planner::execution_step::StepId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("invalid planner configuration: {0}")]
    InvalidConfiguration(String),
    #[error("type \"{0}\" is not described by the federation metadata")]
    UnknownType(String),
    #[error("field \"{field_name}\" does not exist on type \"{type_name}\"")]
    UnknownField {
        type_name: String,
        field_name: String,
    },
    #[error("type \"{type_name}\" has no entity resolver in subgraph \"{subgraph}\"")]
    NoEntityResolver { type_name: String, subgraph: String },
    #[error(
        "field \"{type_name}.{field_name}\" needed by subgraph \"{subgraph}\" cannot be provided by any ancestor fetch"
    )]
    UnresolvableRequirement {
        type_name: String,
        field_name: String,
        subgraph: String,
    },
    #[error("field \"{type_name}.{field_name}\" is of object type and cannot be passed as a requirement")]
    UnsupportedRequirement {
        type_name: String,
        field_name: String,
    },
    #[error("variable \"${0}\" is not defined by the operation")]
    UndefinedVariable(String),
    #[error("selection set {0} is not part of the step selection")]
    MissingSelectionSet(SelectionSetId),
    #[error("dependencies of step {0} do not form a chain")]
    CyclicDependency(StepId),
    #[error("node for step {0} is missing")]
    MissingNode(StepId),
    #[error("planning produced no root node")]
    EmptyPlan,
}
