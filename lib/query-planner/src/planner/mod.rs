use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, instrument, trace};

use crate::ast::operation::OperationDefinition;
use crate::federation_metadata::FederationMetadata;

pub mod context;
pub mod error;
pub mod execution_step;
pub mod plan_nodes;
pub mod stages;

pub use error::PlannerError;
use context::PlanningContext;
use plan_nodes::QueryPlan;
use stages::{default_stages, PlanningStage};

pub const DEFAULT_PLAN_CACHE_SIZE: u64 = 1000;

/// Builds query plans for operations against one federation metadata and
/// caches them by operation shape.
pub struct QueryPlanner {
    metadata: Arc<FederationMetadata>,
    stages: Vec<Box<dyn PlanningStage>>,
    cache: Cache<u64, Arc<QueryPlan>>,
}

impl QueryPlanner {
    pub fn new(metadata: Arc<FederationMetadata>) -> Result<Self, PlannerError> {
        Self::with_cache_size(metadata, DEFAULT_PLAN_CACHE_SIZE)
    }

    pub fn with_cache_size(
        metadata: Arc<FederationMetadata>,
        cache_size: u64,
    ) -> Result<Self, PlannerError> {
        metadata
            .validate()
            .map_err(PlannerError::InvalidConfiguration)?;

        Ok(QueryPlanner {
            metadata,
            stages: default_stages(),
            cache: Cache::new(cache_size),
        })
    }

    pub fn metadata(&self) -> &Arc<FederationMetadata> {
        &self.metadata
    }

    /// Returns the cached plan for the operation's shape, planning it on a miss.
    pub fn plan(&self, operation: &OperationDefinition) -> Result<Arc<QueryPlan>, PlannerError> {
        let cache_key = operation.hash();

        if let Some(plan) = self.cache.get(&cache_key) {
            trace!(cache_key, "query plan cache hit");
            return Ok(plan);
        }

        trace!(cache_key, "query plan cache miss");
        let plan = Arc::new(self.plan_uncached(operation)?);
        self.cache.insert(cache_key, plan.clone());

        Ok(plan)
    }

    #[instrument(level = "trace", skip_all, fields(operation_name = operation.name.as_deref()))]
    pub fn plan_uncached(&self, operation: &OperationDefinition) -> Result<QueryPlan, PlannerError> {
        if operation.selection_set.is_empty() {
            return Err(PlannerError::InvalidConfiguration(
                "operation has an empty selection set".to_string(),
            ));
        }

        let mut ctx = PlanningContext::new(&self.metadata, operation);
        for stage in &self.stages {
            trace!(stage = stage.name(), "running planning stage");
            stage.run(&mut ctx)?;
        }

        let root = ctx.root.take().ok_or(PlannerError::EmptyPlan)?;
        let plan = QueryPlan {
            operation: Arc::new(ctx.operation),
            root,
            exports: ctx.exports,
            dependent_selection_sets: ctx.dependent_selection_sets,
        };
        debug!(nodes = plan.node_count(), "query plan built");

        Ok(plan)
    }
}
