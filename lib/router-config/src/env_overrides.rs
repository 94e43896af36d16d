use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

use crate::log::{LogFormat, LogLevel};

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    // Logger overrides
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    // Query planner overrides
    #[envconfig(from = "QUERY_PLANNER_CACHE_SIZE")]
    pub query_planner_cache_size: Option<u64>,

    // Execution overrides
    #[envconfig(from = "SHOW_DEBUG_INFO")]
    pub show_debug_info: Option<bool>,

    // Federation metadata overrides
    #[envconfig(from = "METADATA_FILE_PATH")]
    pub metadata_file_path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {:?}", log_level);
            config = config.set_override("log.level", log_level.as_str())?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {:?}", log_format);
            config = config.set_override("log.format", log_format.as_str())?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(cache_size) = self.query_planner_cache_size.take() {
            debug!("[config-override] 'query_planner.cache_size' = {}", cache_size);
            config = config.set_override("query_planner.cache_size", cache_size)?;
        }

        if let Some(show_debug_info) = self.show_debug_info.take() {
            debug!("[config-override] 'execution.show_debug_info' = {}", show_debug_info);
            config = config.set_override("execution.show_debug_info", show_debug_info)?;
        }

        if let Some(metadata_file_path) = self.metadata_file_path.take() {
            debug!("[config-override] 'metadata.path' = {}", metadata_file_path);
            config = config.set_override("metadata.path", metadata_file_path)?;
        }

        Ok(config)
    }
}
