#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlanExecutionError {
    #[error("Batch key variable \"{variable}\" holds an unsupported {kind} value")]
    UnsupportedKeyValue {
        variable: String,
        kind: &'static str,
    },
}
