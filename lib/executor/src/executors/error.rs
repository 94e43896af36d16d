use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SubgraphExecutorError {
    #[error("Failed to parse endpoint \"{0}\" as URI: {1}")]
    EndpointParseFailure(String, String),
    #[error("Failed to build request to subgraph \"{0}\": {1}")]
    RequestBuildFailure(String, String),
    #[error("Failed to send request to subgraph \"{0}\": {1}")]
    RequestFailure(String, String),
    #[error("Failed to serialize request body: {0}")]
    RequestSerializationFailure(String),
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),
    #[error("No executor is registered for subgraph \"{0}\"")]
    UnknownSubgraph(String),
}
