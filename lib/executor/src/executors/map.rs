use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use fusion_router_config::traffic_shaping::TrafficShapingConfig;
use hyper_util::{
    client::legacy::Client,
    rt::{TokioExecutor, TokioTimer},
};
use tokio::sync::Semaphore;

use crate::executors::{
    common::{SubgraphExecutionRequest, SubgraphExecutor, SubgraphExecutorBoxedArc},
    error::SubgraphExecutorError,
    http::HttpSubgraphExecutor,
};
use crate::response::storage::ReleaseCallback;

/// Routes subgraph requests to the executor registered under the subgraph name.
pub struct SubgraphExecutorMap {
    inner: HashMap<String, SubgraphExecutorBoxedArc>,
}

impl Default for SubgraphExecutorMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SubgraphExecutorMap {
    pub fn new() -> Self {
        SubgraphExecutorMap {
            inner: HashMap::new(),
        }
    }

    pub async fn execute<'a>(
        &self,
        subgraph_name: &str,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<Bytes, SubgraphExecutorError> {
        match self.inner.get(subgraph_name) {
            Some(executor) => executor.execute(execution_request).await,
            None => Err(SubgraphExecutorError::UnknownSubgraph(
                subgraph_name.to_string(),
            )),
        }
    }

    pub fn insert_boxed_arc(&mut self, subgraph_name: String, boxed_arc: SubgraphExecutorBoxedArc) {
        self.inner.insert(subgraph_name, boxed_arc);
    }

    pub fn contains(&self, subgraph_name: &str) -> bool {
        self.inner.contains_key(subgraph_name)
    }

    /// Hands a response back to the executor that produced it.
    pub fn release_callback(&self, subgraph_name: &str) -> Option<ReleaseCallback> {
        let executor = self.inner.get(subgraph_name)?.clone();
        Some(Box::new(move |response: Bytes| executor.release(response)))
    }

    pub fn from_http_endpoint_map(
        subgraph_endpoint_map: &HashMap<String, String>,
        traffic_shaping: &TrafficShapingConfig,
    ) -> Result<Self, SubgraphExecutorError> {
        let mut builder = Client::builder(TokioExecutor::new());
        let builder_mut = builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(
                traffic_shaping.pool_idle_timeout_seconds,
            ))
            .pool_max_idle_per_host(traffic_shaping.max_connections_per_host);
        let http_client = builder_mut.build_http();
        let http_client_arc = Arc::new(http_client);

        let mut executor_map = SubgraphExecutorMap::new();
        for (subgraph_name, endpoint) in subgraph_endpoint_map {
            let uri = endpoint.parse::<http::Uri>().map_err(|e| {
                SubgraphExecutorError::EndpointParseFailure(endpoint.clone(), e.to_string())
            })?;
            let semaphore = Arc::new(Semaphore::new(traffic_shaping.max_connections_per_host));
            let executor = HttpSubgraphExecutor::new(
                uri,
                http_client_arc.clone(),
                semaphore,
                traffic_shaping.timeout,
            )
            .to_boxed_arc();
            executor_map.insert_boxed_arc(subgraph_name.clone(), executor);
        }

        Ok(executor_map)
    }
}
