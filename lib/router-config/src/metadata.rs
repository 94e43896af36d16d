use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::primitives::file_path::FilePath;

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Path to the federation metadata JSON document, relative to the configuration file.
    ///
    /// Can also be set via the `METADATA_FILE_PATH` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FilePath>,
}
