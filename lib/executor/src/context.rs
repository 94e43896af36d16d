use fusion_query_planner::QueryPlan;
use serde::Serialize;
use serde_json::Value;

use crate::execution::state::RequestState;
use crate::projection::response::project_by_operation;
use crate::response::{graphql_error::GraphQLError, result::ExecutionResult};

pub const CANCELLED_ERROR_MESSAGE: &str = "The operation was cancelled.";

/// Everything one request owns while its plan runs.
pub struct ExecutionContext<'p> {
    pub plan: &'p QueryPlan,
    pub state: RequestState,
    pub result: ExecutionResult,
    pub cancelled: bool,
}

/// The response handed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutput {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl<'p> ExecutionContext<'p> {
    pub fn new(plan: &'p QueryPlan) -> Self {
        let mut state = RequestState::new();
        let root_selection_set = plan.root_selection_set_id();
        state.get_or_create(root_selection_set, &[], plan.exports_for(root_selection_set));

        ExecutionContext {
            plan,
            state,
            result: ExecutionResult::new(),
            cancelled: false,
        }
    }

    pub fn finish(self) -> ExecutionOutput {
        let ExecutionContext {
            plan,
            mut state,
            mut result,
            cancelled,
        } = self;

        state.teardown();
        if cancelled {
            result.errors.push(GraphQLError::from(CANCELLED_ERROR_MESSAGE));
        }

        let (data, errors) = result.finalize();
        ExecutionOutput {
            data: project_by_operation(&data, &plan.operation),
            errors,
        }
    }
}

impl ExecutionOutput {
    pub fn to_bytes(&self) -> Result<bytes::Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(bytes::Bytes::from)
    }
}
