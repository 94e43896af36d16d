use bytes::Bytes;
use fusion_query_planner::ast::selection_set::SelectionSet;
use fusion_query_planner::planner::plan_nodes::{
    ExecutionNode, ResolveByKeyBatchNode, ResolverConfig,
};
use fusion_query_planner::QueryPlan;
use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::context::{ExecutionContext, ExecutionOutput};
use crate::execution::batch::{
    build_batch_variables, create_batch_states, group_by_key, unique_batch_states,
    BatchExecutionState,
};
use crate::execution::error::PlanExecutionError;
use crate::execution::state::StateId;
use crate::executors::{
    common::SubgraphExecutionRequest, error::SubgraphExecutorError, map::SubgraphExecutorMap,
};
use crate::response::{
    graphql_error::GraphQLError,
    merge::deep_merge,
    path::{format_path, PathSegment},
    subgraph_response::SubgraphResponse,
    unwrap::{index_by_keys, lift_data},
};

#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Adds `serviceName` to the extensions of subgraph errors.
    pub show_debug_info: bool,
}

pub async fn execute_query_plan(
    query_plan: &QueryPlan,
    executors: &SubgraphExecutorMap,
    variable_values: Option<&Map<String, Value>>,
    options: &ExecutionOptions,
    cancellation_token: &CancellationToken,
) -> Result<ExecutionOutput, PlanExecutionError> {
    let no_variables = Map::new();
    let executor = QueryPlanExecutor::new(
        executors,
        variable_values.unwrap_or(&no_variables),
        options.show_debug_info,
    );

    let mut ctx = ExecutionContext::new(query_plan);
    executor
        .execute(&mut ctx, &query_plan.root, cancellation_token)
        .await?;

    Ok(ctx.finish())
}

struct ConcurrencyScope<'exec, T> {
    jobs: FuturesUnordered<BoxFuture<'exec, T>>,
}

impl<'exec, T> ConcurrencyScope<'exec, T> {
    fn new() -> Self {
        Self {
            jobs: FuturesUnordered::new(),
        }
    }

    fn spawn(&mut self, future: BoxFuture<'exec, T>) {
        self.jobs.push(future);
    }

    async fn join_all(mut self) -> Vec<T> {
        let mut results = Vec::with_capacity(self.jobs.len());
        while let Some(result) = self.jobs.next().await {
            results.push(result);
        }
        results
    }
}

enum FetchOutcome {
    Response(Bytes),
    Failed(SubgraphExecutorError),
    Cancelled,
}

struct PreparedBatch<'p> {
    entries: Vec<BatchExecutionState>,
    unique: Vec<usize>,
    request: SubgraphExecutionRequest<'p>,
}

enum ResolveJob<'p> {
    Resolve {
        node: &'p ExecutionNode,
        config: &'p ResolverConfig,
        outcomes: Vec<(StateId, FetchOutcome)>,
    },
    Batch {
        node: &'p ExecutionNode,
        batch_node: &'p ResolveByKeyBatchNode,
        entries: Vec<BatchExecutionState>,
        unique: Vec<usize>,
        outcome: FetchOutcome,
    },
}

impl<'p> ResolveJob<'p> {
    fn node(&self) -> &'p ExecutionNode {
        match self {
            ResolveJob::Resolve { node, .. } | ResolveJob::Batch { node, .. } => *node,
        }
    }
}

pub struct QueryPlanExecutor<'exec> {
    executors: &'exec SubgraphExecutorMap,
    variable_values: &'exec Map<String, Value>,
    show_debug_info: bool,
}

impl<'exec> QueryPlanExecutor<'exec> {
    pub fn new(
        executors: &'exec SubgraphExecutorMap,
        variable_values: &'exec Map<String, Value>,
        show_debug_info: bool,
    ) -> Self {
        QueryPlanExecutor {
            executors,
            variable_values,
            show_debug_info,
        }
    }

    #[instrument(level = "trace", skip_all, fields(node_id = ?node.id()))]
    pub async fn execute<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        node: &'p ExecutionNode,
        cancellation_token: &CancellationToken,
    ) -> Result<(), PlanExecutionError> {
        match node {
            ExecutionNode::Sequence(nodes) => {
                for child in nodes {
                    if cancellation_token.is_cancelled() {
                        ctx.cancelled = true;
                        break;
                    }
                    Box::pin(self.execute(ctx, child, cancellation_token)).await?;
                }
                Ok(())
            }
            ExecutionNode::Parallel(nodes) => {
                self.execute_wave(ctx, nodes.iter().collect(), cancellation_token)
                    .await
            }
            ExecutionNode::Resolve(_) | ExecutionNode::ResolveByKeyBatch(_) => {
                let (fetched, _) = self.fetch_wave(ctx, vec![node], cancellation_token).await?;
                if cancellation_token.is_cancelled() {
                    ctx.cancelled = true;
                    return Ok(());
                }
                if fetched.is_empty() {
                    return Ok(());
                }
                self.execute_children(ctx, node, cancellation_token).await
            }
        }
    }

    /// Runs what comes after `node` without running `node` itself.
    pub async fn execute_children<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        node: &'p ExecutionNode,
        cancellation_token: &CancellationToken,
    ) -> Result<(), PlanExecutionError> {
        match node {
            ExecutionNode::Sequence(_) | ExecutionNode::Parallel(_) => {
                Box::pin(self.execute(ctx, node, cancellation_token)).await
            }
            ExecutionNode::Resolve(_) | ExecutionNode::ResolveByKeyBatch(_) => {
                self.execute_wave(ctx, node.children().iter().collect(), cancellation_token)
                    .await
            }
        }
    }

    /// Fetches the wave, then runs the union of the fetched nodes' children
    /// as the next wave. Composite nodes of the wave run last.
    async fn execute_wave<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        nodes: Vec<&'p ExecutionNode>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), PlanExecutionError> {
        if nodes.is_empty() {
            return Ok(());
        }

        let (fetched, composites) = self.fetch_wave(ctx, nodes, cancellation_token).await?;
        if cancellation_token.is_cancelled() {
            ctx.cancelled = true;
            return Ok(());
        }

        let next_wave: Vec<&'p ExecutionNode> = fetched
            .iter()
            .flat_map(|node| node.children())
            .collect();
        if !next_wave.is_empty() {
            Box::pin(self.execute_wave(ctx, next_wave, cancellation_token)).await?;
        }

        for composite in composites {
            Box::pin(self.execute(ctx, composite, cancellation_token)).await?;
        }

        Ok(())
    }

    /// Fetches all resolver nodes of the wave concurrently and applies the results
    /// in completion order. Returns the nodes that fetched and the composite
    /// nodes that were left untouched.
    async fn fetch_wave<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        nodes: Vec<&'p ExecutionNode>,
        cancellation_token: &CancellationToken,
    ) -> Result<(Vec<&'p ExecutionNode>, Vec<&'p ExecutionNode>), PlanExecutionError> {
        if cancellation_token.is_cancelled() {
            ctx.cancelled = true;
            return Ok((vec![], vec![]));
        }

        let mut scope = ConcurrencyScope::new();
        let mut composites = Vec::new();

        for node in nodes {
            match node {
                ExecutionNode::Resolve(resolve) => {
                    let requests = self.prepare_resolve(ctx, &resolve.config);
                    if requests.is_empty() {
                        trace!(node_id = resolve.id, "nothing to resolve, skipping node");
                        continue;
                    }
                    scope.spawn(
                        self.fetch_resolve(node, &resolve.config, requests, cancellation_token)
                            .boxed(),
                    );
                }
                ExecutionNode::ResolveByKeyBatch(batch_node) => {
                    let Some(prepared) = self.prepare_batch(ctx, batch_node)? else {
                        trace!(node_id = batch_node.id, "nothing to resolve, skipping node");
                        continue;
                    };
                    scope.spawn(
                        self.fetch_batch(node, batch_node, prepared, cancellation_token)
                            .boxed(),
                    );
                }
                ExecutionNode::Sequence(_) | ExecutionNode::Parallel(_) => composites.push(node),
            }
        }

        let jobs = scope.join_all().await;

        let mut fetched = Vec::with_capacity(jobs.len());
        for job in jobs {
            fetched.push(job.node());
            self.process_job(ctx, job)?;
        }

        Ok((fetched, composites))
    }

    fn forwarded_variables(&self, config: &ResolverConfig) -> Map<String, Value> {
        config
            .forwarded_variables
            .iter()
            .filter_map(|name| {
                self.variable_values
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    fn prepare_resolve<'p>(
        &self,
        ctx: &ExecutionContext<'p>,
        config: &'p ResolverConfig,
    ) -> Vec<(StateId, SubgraphExecutionRequest<'p>)> {
        let mut requests = Vec::new();

        for state_id in ctx.state.state_ids(config.selection_set_id) {
            let state = ctx.state.get(*state_id);
            if !state.has_variables(&config.requires) {
                trace!(
                    path = %format_path(&state.path),
                    "entity lacks a required variable, skipping it"
                );
                continue;
            }

            let mut variables = self.forwarded_variables(config);
            for variable in &config.requires {
                if let Some(value) = state.variable_values.get(variable) {
                    variables.insert(variable.clone(), value.clone());
                }
            }
            requests.push((
                *state_id,
                SubgraphExecutionRequest::new(&config.document, variables),
            ));
        }

        requests
    }

    fn prepare_batch<'p>(
        &self,
        ctx: &ExecutionContext<'p>,
        batch_node: &'p ResolveByKeyBatchNode,
    ) -> Result<Option<PreparedBatch<'p>>, PlanExecutionError> {
        let config = &batch_node.config;
        let state_ids = ctx.state.state_ids(config.selection_set_id);
        if state_ids.is_empty() {
            return Ok(None);
        }

        let entries = create_batch_states(
            &ctx.state,
            state_ids,
            &config.requires,
            &batch_node.key_variables,
        )?;
        if entries.is_empty() {
            return Ok(None);
        }

        let unique = unique_batch_states(&entries);
        let mut variables = self.forwarded_variables(config);
        variables.extend(build_batch_variables(
            &ctx.state,
            &entries,
            &unique,
            &config.requires,
            &config.argument_types,
        ));

        trace!(
            node_id = batch_node.id,
            entities = entries.len(),
            unique = unique.len(),
            "prepared batch"
        );

        Ok(Some(PreparedBatch {
            entries,
            unique,
            request: SubgraphExecutionRequest::new(&config.document, variables),
        }))
    }

    async fn fetch(
        &self,
        subgraph_name: &str,
        request: SubgraphExecutionRequest<'_>,
        cancellation_token: &CancellationToken,
    ) -> FetchOutcome {
        debug!(subgraph = subgraph_name, "executing subgraph request");

        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => FetchOutcome::Cancelled,
            result = self.executors.execute(subgraph_name, request) => match result {
                Ok(response) => FetchOutcome::Response(response),
                Err(err) => FetchOutcome::Failed(err),
            },
        }
    }

    async fn fetch_resolve<'p>(
        &self,
        node: &'p ExecutionNode,
        config: &'p ResolverConfig,
        requests: Vec<(StateId, SubgraphExecutionRequest<'p>)>,
        cancellation_token: &CancellationToken,
    ) -> ResolveJob<'p> {
        let outcomes = futures::future::join_all(requests.into_iter().map(
            |(state_id, request)| async move {
                let outcome = self
                    .fetch(&config.subgraph_name, request, cancellation_token)
                    .await;
                (state_id, outcome)
            },
        ))
        .await;

        ResolveJob::Resolve {
            node,
            config,
            outcomes,
        }
    }

    async fn fetch_batch<'p>(
        &self,
        node: &'p ExecutionNode,
        batch_node: &'p ResolveByKeyBatchNode,
        prepared: PreparedBatch<'p>,
        cancellation_token: &CancellationToken,
    ) -> ResolveJob<'p> {
        let PreparedBatch {
            entries,
            unique,
            request,
        } = prepared;
        let outcome = self
            .fetch(&batch_node.config.subgraph_name, request, cancellation_token)
            .await;

        ResolveJob::Batch {
            node,
            batch_node,
            entries,
            unique,
            outcome,
        }
    }

    fn process_job<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        job: ResolveJob<'p>,
    ) -> Result<(), PlanExecutionError> {
        match job {
            ResolveJob::Resolve {
                config, outcomes, ..
            } => {
                for (state_id, outcome) in outcomes {
                    let state_path = ctx.state.get(state_id).path.clone();
                    let error_path = (!state_path.is_empty()).then(|| state_path.clone());
                    let Some(mut response) = self.accept_outcome(ctx, config, outcome, error_path)
                    else {
                        continue;
                    };

                    for error in response.take_errors() {
                        let path = error
                            .path
                            .as_deref()
                            .map(|path| entity_error_path(path, &config.path, &state_path));
                        ctx.result
                            .add_error(error, path, &config.subgraph_name, self.show_debug_info);
                    }

                    match lift_data(&response.data, &config.path) {
                        Some(data) => self.apply_entity(ctx, config, state_id, data),
                        None => trace!(
                            path = %format_path(&state_path),
                            subgraph = %config.subgraph_name,
                            "subgraph returned no data"
                        ),
                    }
                }
                Ok(())
            }
            ResolveJob::Batch {
                batch_node,
                entries,
                unique,
                outcome,
                ..
            } => {
                let config = &batch_node.config;
                let Some(mut response) = self.accept_outcome(ctx, config, outcome, None) else {
                    return Ok(());
                };

                let unique_paths: Vec<Vec<PathSegment>> = unique
                    .iter()
                    .map(|position| ctx.state.get(entries[*position].state_id).path.clone())
                    .collect();
                for error in response.take_errors() {
                    let path = error
                        .path
                        .as_deref()
                        .and_then(|path| batch_error_path(path, &config.path, &unique_paths));
                    ctx.result
                        .add_error(error, path, &config.subgraph_name, self.show_debug_info);
                }

                let Some(data) = lift_data(&response.data, &config.path) else {
                    trace!(subgraph = %config.subgraph_name, "subgraph returned no data");
                    return Ok(());
                };

                let entities = index_by_keys(data, &batch_node.export_keys, &batch_node.key_variables)?;
                // Groups and unique entries share first-seen order.
                let groups = group_by_key(&entries);
                for (position, state_ids) in unique.iter().zip(groups.values()) {
                    let match_key = &entries[*position].match_key;
                    let Some(entity) = entities.get(match_key) else {
                        trace!(key = %match_key, "no entity returned for key");
                        continue;
                    };
                    for state_id in state_ids {
                        self.apply_entity(ctx, config, *state_id, entity);
                    }
                }
                Ok(())
            }
        }
    }

    /// Registers the raw response and parses it.
    /// Transport and parse failures become errors of the aggregate result.
    fn accept_outcome(
        &self,
        ctx: &mut ExecutionContext<'_>,
        config: &ResolverConfig,
        outcome: FetchOutcome,
        error_path: Option<Vec<PathSegment>>,
    ) -> Option<SubgraphResponse> {
        match outcome {
            FetchOutcome::Cancelled => {
                ctx.cancelled = true;
                None
            }
            FetchOutcome::Failed(err) => {
                warn!(subgraph = %config.subgraph_name, error = %err, "subgraph request failed");
                ctx.result.add_error(
                    GraphQLError::from(format!(
                        "Failed to execute request to subgraph \"{}\": {}",
                        config.subgraph_name, err
                    )),
                    error_path,
                    &config.subgraph_name,
                    self.show_debug_info,
                );
                None
            }
            FetchOutcome::Response(response) => {
                let parsed = SubgraphResponse::from_bytes(&response);
                ctx.result.register_for_cleanup(
                    response,
                    self.executors.release_callback(&config.subgraph_name),
                );

                match parsed {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        warn!(subgraph = %config.subgraph_name, error = %err, "subgraph response is not valid JSON");
                        ctx.result.add_error(
                            GraphQLError::from(format!(
                                "Failed to parse response from subgraph \"{}\": {}",
                                config.subgraph_name, err
                            )),
                            error_path,
                            &config.subgraph_name,
                            self.show_debug_info,
                        );
                        None
                    }
                }
            }
        }
    }

    fn apply_entity<'p>(
        &self,
        ctx: &mut ExecutionContext<'p>,
        config: &'p ResolverConfig,
        state_id: StateId,
        data: &Value,
    ) {
        if !data.is_object() {
            trace!("entity data is not an object, ignoring it");
            return;
        }

        let path = ctx.state.get(state_id).path.clone();
        match ctx.result.data_at_path_mut(&path) {
            Some(target) => deep_merge(target, data.clone()),
            None => {
                trace!(path = %format_path(&path), "entity is missing from the response, skipping it");
                return;
            }
        }

        self.extract_states(ctx, &config.selection_set, data, &path, Some(state_id));
    }

    /// Walks entity data along the subgraph selection and records the variables
    /// that dependent resolver nodes read.
    fn extract_states(
        &self,
        ctx: &mut ExecutionContext<'_>,
        selection_set: &SelectionSet,
        data: &Value,
        path: &[PathSegment],
        state_id: Option<StateId>,
    ) {
        match data {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(PathSegment::Index(index));
                    self.extract_states(ctx, selection_set, item, &item_path, None);
                }
            }
            Value::Object(object) => {
                let plan = ctx.plan;
                if state_id.is_some() || plan.has_dependent_nodes(selection_set.id) {
                    let exports = plan.exports_for(selection_set.id);
                    let id = match state_id {
                        Some(id) => id,
                        None => ctx.state.get_or_create(selection_set.id, path, exports),
                    };
                    let state = ctx.state.get_mut(id);
                    for export in exports {
                        if let Some(value) = object.get(&export.alias) {
                            state
                                .variable_values
                                .insert(export.variable.clone(), value.clone());
                        }
                    }
                }

                for field in &selection_set.items {
                    let Some(child_selection_set) = &field.selection_set else {
                        continue;
                    };
                    let response_name = field.response_name();
                    let Some(child) = object.get(response_name) else {
                        continue;
                    };
                    if child.is_null() {
                        continue;
                    }
                    let mut child_path = path.to_vec();
                    child_path.push(PathSegment::field(response_name));
                    self.extract_states(ctx, child_selection_set, child, &child_path, None);
                }
            }
            _ => {}
        }
    }
}

fn strip_result_path<'e>(
    error_path: &'e [PathSegment],
    result_path: &[String],
) -> Option<&'e [PathSegment]> {
    if error_path.len() < result_path.len() {
        return None;
    }
    let matches = result_path
        .iter()
        .zip(error_path)
        .all(|(field, segment)| matches!(segment, PathSegment::Field(name) if name == field));
    matches.then(|| &error_path[result_path.len()..])
}

/// Moves an error path of an entity request under the entity's response path.
fn entity_error_path(
    error_path: &[PathSegment],
    result_path: &[String],
    state_path: &[PathSegment],
) -> Vec<PathSegment> {
    let mut path = state_path.to_vec();
    if let Some(rest) = strip_result_path(error_path, result_path) {
        path.extend_from_slice(rest);
    }
    path
}

/// Maps the list position of a batched error to the response path of the entity requested there.
fn batch_error_path(
    error_path: &[PathSegment],
    result_path: &[String],
    unique_paths: &[Vec<PathSegment>],
) -> Option<Vec<PathSegment>> {
    let rest = strip_result_path(error_path, result_path)?;
    match rest.split_first() {
        Some((PathSegment::Index(position), tail)) => {
            let mut path = unique_paths.get(*position)?.clone();
            path.extend_from_slice(tail);
            Some(path)
        }
        _ => None,
    }
}
