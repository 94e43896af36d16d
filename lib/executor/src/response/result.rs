use bytes::Bytes;
use serde_json::{Map, Value};

use crate::response::{
    graphql_error::GraphQLError,
    path::PathSegment,
    storage::{ReleaseCallback, ResponsesStorage},
};

/// Aggregate response of one request while its plan runs.
#[derive(Debug)]
pub struct ExecutionResult {
    pub data: Value,
    pub errors: Vec<GraphQLError>,
    responses: ResponsesStorage,
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
            errors: Vec::new(),
            responses: ResponsesStorage::new(),
        }
    }

    pub fn register_for_cleanup(&mut self, response: Bytes, release: Option<ReleaseCallback>) {
        self.responses.add_response(response, release);
    }

    pub fn add_error(
        &mut self,
        mut error: GraphQLError,
        path: Option<Vec<PathSegment>>,
        subgraph_name: &str,
        show_debug_info: bool,
    ) {
        error.path = path;
        if show_debug_info {
            error.add_extension("serviceName", Value::String(subgraph_name.to_string()));
        }
        self.errors.push(error);
    }

    /// Walks `path` from the root data. Missing or null steps yield `None`.
    pub fn data_at_path_mut(&mut self, path: &[PathSegment]) -> Option<&mut Value> {
        let mut current = &mut self.data;
        for segment in path {
            current = match (segment, current) {
                (PathSegment::Field(name), Value::Object(map)) => map.get_mut(name)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        if current.is_null() {
            return None;
        }
        Some(current)
    }

    pub fn finalize(mut self) -> (Value, Vec<GraphQLError>) {
        self.responses.release_all();
        let data = std::mem::take(&mut self.data);
        let errors = std::mem::take(&mut self.errors);
        (data, errors)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use bytes::Bytes;
    use serde_json::json;

    use super::ExecutionResult;
    use crate::response::{graphql_error::GraphQLError, path::PathSegment};

    #[test]
    fn finds_data_by_path() {
        let mut result = ExecutionResult::new();
        result.data = json!({ "topProducts": [{ "upc": "1" }, null] });

        let path = vec![PathSegment::field("topProducts"), PathSegment::Index(0)];
        assert_eq!(
            result.data_at_path_mut(&path).cloned(),
            Some(json!({ "upc": "1" }))
        );

        let null_path = vec![PathSegment::field("topProducts"), PathSegment::Index(1)];
        assert!(result.data_at_path_mut(&null_path).is_none());

        let missing_path = vec![PathSegment::field("me")];
        assert!(result.data_at_path_mut(&missing_path).is_none());
    }

    #[test]
    fn debug_info_adds_service_name() {
        let mut result = ExecutionResult::new();
        result.add_error(
            GraphQLError::from("boom"),
            Some(vec![PathSegment::field("me")]),
            "accounts",
            true,
        );
        result.add_error(GraphQLError::from("quiet"), None, "accounts", false);

        let (_, errors) = result.finalize();
        assert_eq!(
            serde_json::to_value(&errors).expect("serializable"),
            json!([
                { "message": "boom", "path": ["me"], "extensions": { "serviceName": "accounts" } },
                { "message": "quiet" }
            ])
        );
    }

    #[test]
    fn finalize_releases_responses() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();

        let mut result = ExecutionResult::new();
        result.register_for_cleanup(
            Bytes::from_static(b"{}"),
            Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))),
        );
        let _ = result.finalize();

        assert!(released.load(Ordering::SeqCst));
    }
}
