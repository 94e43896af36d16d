mod field_requirements;
mod node_builder;
mod requirements;
mod step_discovery;
mod tree_builder;

pub use field_requirements::FieldRequirementsStage;
pub use node_builder::NodeBuilderStage;
pub use requirements::RequirementsStage;
pub use step_discovery::StepDiscoveryStage;
pub use tree_builder::TreeBuilderStage;

use crate::planner::context::PlanningContext;
use crate::planner::error::PlannerError;

/// One step of the planning pipeline. Stages run in a fixed order over the
/// same context; an error aborts planning and the context is discarded.
pub trait PlanningStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError>;
}

pub fn default_stages() -> Vec<Box<dyn PlanningStage>> {
    vec![
        Box::new(StepDiscoveryStage),
        Box::new(FieldRequirementsStage),
        Box::new(RequirementsStage),
        Box::new(NodeBuilderStage),
        Box::new(TreeBuilderStage),
    ]
}
