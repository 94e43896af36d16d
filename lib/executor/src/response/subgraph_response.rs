use serde::Deserialize;
use serde_json::Value;

use crate::response::graphql_error::GraphQLError;

#[derive(Debug, Default, Deserialize)]
pub struct SubgraphResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl SubgraphResponse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn take_errors(&mut self) -> Vec<GraphQLError> {
        self.errors.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::SubgraphResponse;

    #[test]
    fn missing_data_is_null() {
        let mut response =
            SubgraphResponse::from_bytes(br#"{"errors":[{"message":"nope"}]}"#).expect("valid");

        assert_eq!(response.data, Value::Null);
        assert_eq!(response.take_errors().len(), 1);
        assert!(response.take_errors().is_empty());
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(SubgraphResponse::from_bytes(b"<html>bad gateway</html>").is_err());
    }
}
