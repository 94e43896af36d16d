pub mod context;
pub mod execution;
pub mod executors;
pub mod projection;
pub mod response;

#[cfg(test)]
mod tests;

pub use context::ExecutionOutput;
pub use execution::error::PlanExecutionError;
pub use execution::plan::{execute_query_plan, ExecutionOptions, QueryPlanExecutor};
pub use executors::map::SubgraphExecutorMap;
