use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::executors::error::SubgraphExecutorError;

#[async_trait]
pub trait SubgraphExecutor {
    async fn execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<Bytes, SubgraphExecutorError>;

    /// Takes back a response buffer once the request no longer reads from it.
    fn release(&self, _response: Bytes) {}

    fn to_boxed_arc<'a>(self) -> Arc<Box<dyn SubgraphExecutor + Send + Sync + 'a>>
    where
        Self: Sized + Send + Sync + 'a,
    {
        Arc::new(Box::new(self))
    }
}

pub type SubgraphExecutorType = dyn crate::executors::common::SubgraphExecutor + Send + Sync;

pub type SubgraphExecutorBoxedArc = Arc<Box<SubgraphExecutorType>>;

/// The GraphQL request body sent to a subgraph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphExecutionRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl<'a> SubgraphExecutionRequest<'a> {
    pub fn new(query: &'a str, variables: Map<String, Value>) -> Self {
        Self {
            query,
            operation_name: None,
            variables,
        }
    }

    pub fn to_body(&self) -> Result<Bytes, SubgraphExecutorError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|err| SubgraphExecutorError::RequestSerializationFailure(err.to_string()))
    }
}
