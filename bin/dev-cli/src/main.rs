use std::env;
use std::error::Error;
use std::process;
use std::sync::Arc;

use fusion_plan_executor::{execute_query_plan, ExecutionOptions, SubgraphExecutorMap};
use fusion_query_planner::{
    build_operation, FederationMetadata, OperationDefinition, QueryPlan, QueryPlanner,
};
use fusion_router_config::{
    load_config,
    log::{LogFormat, LoggingConfig},
    subgraphs::endpoint_map,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "Usage:
  fusion-dev-cli operation <metadata_path> <operation_path>
  fusion-dev-cli plan <metadata_path> <operation_path> [--json]
  fusion-dev-cli execute <operation_path> [--config <config_path>] [--variables <json>]";

fn init_tree_logger(filter: EnvFilter) {
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
        .with(filter)
        .init();
}

fn init_logger(config: &LoggingConfig) {
    let filter = EnvFilter::new(config.env_filter_str());

    match config.format {
        LogFormat::PrettyTree => init_tree_logger(filter),
        LogFormat::PrettyCompact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|position| args.get(position + 1))
        .map(String::as_str)
}

fn read_metadata(path: &str) -> Result<Arc<FederationMetadata>, Box<dyn Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|err| format!("Unable to read federation metadata \"{}\": {}", path, err))?;

    Ok(Arc::new(FederationMetadata::from_json(&source)?))
}

fn read_operation(
    metadata: &FederationMetadata,
    path: &str,
) -> Result<OperationDefinition, Box<dyn Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|err| format!("Unable to read operation \"{}\": {}", path, err))?;

    Ok(build_operation(metadata, &source, None)?)
}

fn process_plan(metadata_path: &str, operation_path: &str) -> Result<Arc<QueryPlan>, Box<dyn Error>> {
    let metadata = read_metadata(metadata_path)?;
    let operation = read_operation(&metadata, operation_path)?;
    let planner = QueryPlanner::new(metadata)?;

    Ok(planner.plan(&operation)?)
}

async fn process_execute(args: &[String]) -> Result<(), Box<dyn Error>> {
    let operation_path = args.get(2).ok_or(USAGE)?;
    let config = load_config(flag_value(args, "--config").map(String::from))?;
    init_logger(&config.log);

    let metadata_path = config
        .metadata
        .path
        .as_ref()
        .ok_or("No federation metadata configured, set `metadata.path` or METADATA_FILE_PATH")?;
    let metadata = read_metadata(&metadata_path.absolute.to_string_lossy())?;
    let operation = read_operation(&metadata, operation_path)?;

    let planner = QueryPlanner::with_cache_size(metadata, config.query_planner.cache_size)?;
    let plan = planner.plan(&operation)?;
    info!(nodes = plan.node_count(), "planned operation");

    let variables = match flag_value(args, "--variables") {
        Some(raw) => match serde_json::from_str(raw)? {
            serde_json::Value::Object(variables) => Some(variables),
            _ => return Err("--variables must be a JSON object".into()),
        },
        None => None,
    };

    let executors = SubgraphExecutorMap::from_http_endpoint_map(
        &endpoint_map(&config.subgraphs),
        &config.traffic_shaping,
    )?;
    let options = ExecutionOptions {
        show_debug_info: config.execution.show_debug_info,
    };

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let output = execute_query_plan(
        &plan,
        &executors,
        variables.as_ref(),
        &options,
        &cancellation_token,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    match args.get(1).map(String::as_str) {
        Some("operation") if args.len() >= 4 => {
            init_tree_logger(EnvFilter::from_default_env());
            let metadata = read_metadata(&args[2])?;
            println!("{}", read_operation(&metadata, &args[3])?);
        }
        Some("plan") if args.len() >= 4 => {
            init_tree_logger(EnvFilter::from_default_env());
            let plan = process_plan(&args[2], &args[3])?;
            if args.iter().any(|arg| arg == "--json") {
                println!("{}", serde_json::to_string_pretty(plan.as_ref())?);
            } else {
                println!("{}", plan);
            }
        }
        Some("execute") => process_execute(args).await?,
        _ => return Err(USAGE.into()),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if let Err(err) = run(&args).await {
        eprintln!("{}", err);
        process::exit(1);
    }
}
