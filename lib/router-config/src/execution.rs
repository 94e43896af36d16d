use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Adds the name of the failing subgraph (`serviceName`) to the `extensions` of every subgraph error.
    ///
    /// Can also be set via the `SHOW_DEBUG_INFO` environment variable.
    #[serde(default)]
    pub show_debug_info: bool,
}
