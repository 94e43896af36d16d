use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;
use http::HeaderValue;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::{body::Bytes, Version};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::executors::common::{SubgraphExecutionRequest, SubgraphExecutor};
use crate::executors::error::SubgraphExecutorError;

pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Sends one POST per request. Concurrency is bounded by the semaphore.
#[derive(Debug)]
pub struct HttpSubgraphExecutor {
    pub endpoint: http::Uri,
    pub http_client: Arc<HttpClient>,
    pub header_map: HeaderMap,
    pub semaphore: Arc<Semaphore>,
    pub timeout: Duration,
}

impl HttpSubgraphExecutor {
    pub fn new(
        endpoint: http::Uri,
        http_client: Arc<HttpClient>,
        semaphore: Arc<Semaphore>,
        timeout: Duration,
    ) -> Self {
        let mut header_map = HeaderMap::new();
        header_map.insert(
            "Content-Type",
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        header_map.insert(
            http::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        Self {
            endpoint,
            http_client,
            header_map,
            semaphore,
            timeout,
        }
    }

    async fn _execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<Bytes, SubgraphExecutorError> {
        let body = execution_request.to_body()?;

        let mut req = hyper::Request::builder()
            .method(http::Method::POST)
            .uri(&self.endpoint)
            .version(Version::HTTP_11)
            .body(Full::new(body))
            .map_err(|e| {
                SubgraphExecutorError::RequestBuildFailure(self.endpoint.to_string(), e.to_string())
            })?;

        *req.headers_mut() = self.header_map.clone();

        let res = self.http_client.request(req).await.map_err(|e| {
            SubgraphExecutorError::RequestFailure(self.endpoint.to_string(), e.to_string())
        })?;

        debug!(status = %res.status(), endpoint = %self.endpoint, "subgraph responded");

        Ok(res
            .into_body()
            .collect()
            .await
            .map_err(|e| {
                SubgraphExecutorError::RequestFailure(self.endpoint.to_string(), e.to_string())
            })?
            .to_bytes())
    }
}

#[async_trait]
impl SubgraphExecutor for HttpSubgraphExecutor {
    #[instrument(level = "trace", skip_all, fields(endpoint = %self.endpoint))]
    async fn execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<Bytes, SubgraphExecutorError> {
        // Fails only when the semaphore is closed, which never happens while the executor lives.
        let _permit = self.semaphore.acquire().await.map_err(|e| {
            SubgraphExecutorError::RequestFailure(self.endpoint.to_string(), e.to_string())
        })?;

        tokio::time::timeout(self.timeout, self._execute(execution_request))
            .await
            .map_err(|_| SubgraphExecutorError::RequestTimeout(self.timeout))?
    }
}
