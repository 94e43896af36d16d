pub mod ast;
pub mod federation_metadata;
pub mod field_flags_optimizer;
pub mod planner;
pub mod utils;

#[cfg(test)]
mod tests;

pub use ast::operation::OperationDefinition;
pub use ast::resolution::{build_operation, OperationBuildError};
pub use federation_metadata::FederationMetadata;
pub use planner::plan_nodes::QueryPlan;
pub use planner::{PlannerError, QueryPlanner};
