use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct QueryPlannerConfig {
    /// The maximum number of query plans kept in memory.
    /// Plans are cached by the shape of the operation, so operations that only differ in variable values share a plan.
    ///
    /// Can also be set via the `QUERY_PLANNER_CACHE_SIZE` environment variable.
    ///
    /// Default: 1000.
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
}

impl Default for QueryPlannerConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
        }
    }
}

fn default_cache_size() -> u64 {
    1000
}
