pub mod graphql_error;
pub mod merge;
pub mod path;
pub mod result;
pub mod storage;
pub mod subgraph_response;
pub mod unwrap;
