use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::response::path::PathSegment;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GraphQLErrorLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl From<String> for GraphQLError {
    fn from(message: String) -> Self {
        GraphQLError {
            message,
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

impl From<&str> for GraphQLError {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

impl GraphQLError {
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Non-object extensions coming from a subgraph are replaced.
    pub fn add_extension(&mut self, key: &str, value: Value) {
        let extensions = self
            .extensions
            .get_or_insert_with(|| Value::Object(Map::new()));
        if !extensions.is_object() {
            *extensions = Value::Object(Map::new());
        }
        if let Value::Object(map) = extensions {
            map.insert(key.to_string(), value);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GraphQLErrorLocation {
    pub line: usize,
    pub column: usize,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GraphQLError;
    use crate::response::path::PathSegment;

    #[test]
    fn parses_subgraph_error() {
        let error: GraphQLError = serde_json::from_value(json!({
            "message": "boom",
            "locations": [{ "line": 1, "column": 3 }],
            "path": ["_entities", 0, "name"],
            "extensions": { "code": "INTERNAL" }
        }))
        .expect("valid error");

        assert_eq!(error.message, "boom");
        assert_eq!(
            error.path,
            Some(vec![
                PathSegment::field("_entities"),
                PathSegment::Index(0),
                PathSegment::field("name"),
            ])
        );
    }

    #[test]
    fn adds_extensions_to_plain_error() {
        let mut error = GraphQLError::from("boom");
        error.add_extension("serviceName", json!("products"));
        error.add_extension("code", json!("DOWNSTREAM_SERVICE_ERROR"));

        assert_eq!(
            serde_json::to_value(&error).expect("serializable"),
            json!({
                "message": "boom",
                "extensions": {
                    "serviceName": "products",
                    "code": "DOWNSTREAM_SERVICE_ERROR"
                }
            })
        );
    }
}
