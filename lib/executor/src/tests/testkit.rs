use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, Once,
};

use async_trait::async_trait;
use bytes::Bytes;
use fusion_query_planner::{build_operation, FederationMetadata, QueryPlan, QueryPlanner};
use lazy_static::lazy_static;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::context::ExecutionOutput;
use crate::executors::{
    common::{SubgraphExecutionRequest, SubgraphExecutor},
    error::SubgraphExecutorError,
};
use crate::{execute_query_plan, ExecutionOptions, PlanExecutionError, SubgraphExecutorMap};

pub const PRODUCTS_FIXTURE: &str = "../query-planner/fixture/tests/products.metadata.json";

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

pub fn metadata_value() -> Value {
    let metadata_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(PRODUCTS_FIXTURE);
    let source = std::fs::read_to_string(metadata_path).expect("Unable to read input file");
    serde_json::from_str(&source).expect("metadata fixture is JSON")
}

pub fn plan_with_metadata(metadata: Value, operation: &str) -> Arc<QueryPlan> {
    let metadata: FederationMetadata =
        serde_json::from_value(metadata).expect("invalid federation metadata");
    let metadata = Arc::new(metadata);
    let operation = build_operation(&metadata, operation, None).expect("invalid operation");
    let planner = QueryPlanner::new(metadata).expect("invalid planner configuration");

    planner.plan(&operation).expect("failed to plan operation")
}

pub fn plan(operation: &str) -> Arc<QueryPlan> {
    plan_with_metadata(metadata_value(), operation)
}

/// The alias a plan uses to export `variable`.
pub fn export_alias(plan: &QueryPlan, variable: &str) -> String {
    plan.exports
        .values()
        .flatten()
        .find(|export| export.variable == variable)
        .map(|export| export.alias.clone())
        .unwrap_or_else(|| panic!("plan does not export {}", variable))
}

pub fn data(value: Value) -> MockReply {
    MockReply::Json(json!({ "data": value }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub subgraph: String,
    pub query: String,
    pub variables: Map<String, Value>,
}

pub enum MockReply {
    Json(Value),
    Fail(SubgraphExecutorError),
    Hang,
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RecordedCall>>>);

impl CallLog {
    fn record(&self, call: RecordedCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn calls_to(&self, subgraph: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.subgraph == subgraph)
            .collect()
    }

    pub fn subgraph_order(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.subgraph).collect()
    }
}

type Handler = Box<dyn Fn(&SubgraphExecutionRequest<'_>) -> MockReply + Send + Sync>;

struct MockSubgraph {
    name: String,
    handler: Handler,
    log: CallLog,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl SubgraphExecutor for MockSubgraph {
    async fn execute<'a>(
        &self,
        execution_request: SubgraphExecutionRequest<'a>,
    ) -> Result<Bytes, SubgraphExecutorError> {
        self.log.record(RecordedCall {
            subgraph: self.name.clone(),
            query: execution_request.query.to_string(),
            variables: execution_request.variables.clone(),
        });

        match (self.handler)(&execution_request) {
            MockReply::Json(body) => Ok(Bytes::from(serde_json::to_vec(&body).unwrap())),
            MockReply::Fail(error) => Err(error),
            MockReply::Hang => futures::future::pending().await,
        }
    }

    fn release(&self, _response: Bytes) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory subgraphs that record every request they receive.
pub struct MockSubgraphs {
    map: SubgraphExecutorMap,
    pub log: CallLog,
    released: Arc<AtomicUsize>,
}

impl MockSubgraphs {
    pub fn new() -> Self {
        Self {
            map: SubgraphExecutorMap::new(),
            log: CallLog::default(),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&SubgraphExecutionRequest<'_>) -> MockReply + Send + Sync + 'static,
    {
        let subgraph = MockSubgraph {
            name: name.to_string(),
            handler: Box::new(handler),
            log: self.log.clone(),
            released: self.released.clone(),
        };
        self.map
            .insert_boxed_arc(name.to_string(), subgraph.to_boxed_arc());
        self
    }

    /// Number of responses handed back to their subgraph.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub async fn run(
        &self,
        plan: &QueryPlan,
        variables: Option<Value>,
    ) -> Result<ExecutionOutput, PlanExecutionError> {
        self.run_with(
            plan,
            variables,
            &ExecutionOptions::default(),
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn run_with(
        &self,
        plan: &QueryPlan,
        variables: Option<Value>,
        options: &ExecutionOptions,
        cancellation_token: &CancellationToken,
    ) -> Result<ExecutionOutput, PlanExecutionError> {
        let variables = variables.and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        });
        execute_query_plan(
            plan,
            &self.map,
            variables.as_ref(),
            options,
            cancellation_token,
        )
        .await
    }
}

/// Inventory subgraph answering both the batch and the single entity resolver.
pub fn inventory(request: &SubgraphExecutionRequest<'_>) -> MockReply {
    let in_stock = |upc: &Value| upc.as_str() == Some("1");
    match request.variables.get("Product_upc") {
        Some(Value::Array(upcs)) => data(json!({
            "productsByUpc": upcs
                .iter()
                .map(|upc| json!({ "inStock": in_stock(upc), "_internal_key_0": upc }))
                .collect::<Vec<_>>()
        })),
        Some(upc) => data(json!({ "productByUpc": { "inStock": in_stock(upc) } })),
        None => MockReply::Json(json!({ "errors": [{ "message": "missing upc" }] })),
    }
}

pub fn top_products(
    products: Value,
) -> impl Fn(&SubgraphExecutionRequest<'_>) -> MockReply + Send + Sync + 'static {
    move |_| data(json!({ "topProducts": products.clone() }))
}
