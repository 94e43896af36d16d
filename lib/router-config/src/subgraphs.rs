use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Subgraph endpoints, keyed by the subgraph name used in the federation metadata.
pub type SubgraphsConfig = HashMap<String, SubgraphConfig>;

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubgraphConfig {
    /// The GraphQL endpoint of the subgraph, e.g. `http://localhost:4001/graphql`.
    pub url: String,
}

pub fn endpoint_map(subgraphs: &SubgraphsConfig) -> HashMap<String, String> {
    subgraphs
        .iter()
        .map(|(name, subgraph)| (name.clone(), subgraph.url.clone()))
        .collect()
}
