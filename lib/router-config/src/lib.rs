mod env_overrides;
pub mod execution;
pub mod log;
pub mod metadata;
pub mod primitives;
pub mod query_planner;
pub mod subgraphs;
pub mod traffic_shaping;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    execution::ExecutionConfig,
    log::LoggingConfig,
    metadata::MetadataConfig,
    primitives::file_path::with_start_path,
    query_planner::QueryPlannerConfig,
    subgraphs::SubgraphsConfig,
    traffic_shaping::TrafficShapingConfig,
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FusionRouterConfig {
    #[serde(skip)]
    root_directory: PathBuf,

    /// The logger configuration.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Where the federation metadata is read from.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Query planning configuration.
    #[serde(default)]
    pub query_planner: QueryPlannerConfig,

    /// Configuration for the traffic-shaping of the executor. Use these configurations to control how requests are being executed to subgraphs.
    #[serde(default)]
    pub traffic_shaping: TrafficShapingConfig,

    /// Plan execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Subgraph endpoints.
    #[serde(default)]
    pub subgraphs: SubgraphsConfig,
}

impl FusionRouterConfig {
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to get the current directory: {0}")]
    CurrentDirError(std::io::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "router.config.yaml",
    "router.config.yml",
    "router.config.json",
    "router.config.json5",
];

fn get_current_dir() -> Result<PathBuf, RouterConfigError> {
    std::env::current_dir().map_err(RouterConfigError::CurrentDirError)
}

pub fn load_config(
    override_config_path: Option<String>,
) -> Result<FusionRouterConfig, RouterConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();
    let mut config_root_path = get_current_dir()?;

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<PathBuf>()
            .map_err(RouterConfigError::ConfigPathParseError)?;
        if let Some(parent_dir) = path_buf.parent() {
            config_root_path = config_root_path.join(parent_dir);
        }
        let as_file: File<FileSourceFile, _> = path_buf.into();
        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    let mut base_cfg = with_start_path(&config_root_path, || {
        config.build()?.try_deserialize::<FusionRouterConfig>()
    })?;

    base_cfg.root_directory = config_root_path;

    Ok(base_cfg)
}

pub fn parse_yaml_config(config_raw: String) -> Result<FusionRouterConfig, RouterConfigError> {
    parse_with_overrides(&config_raw, FileFormat::Yaml, None)
}

fn parse_with_overrides(
    config_raw: &str,
    format: FileFormat,
    env_overrides: Option<EnvVarOverrides>,
) -> Result<FusionRouterConfig, RouterConfigError> {
    let config_root_path = get_current_dir()?;
    let mut config = Config::builder().add_source(File::from_str(config_raw, format));

    if let Some(env_overrides) = env_overrides {
        config = env_overrides.apply_overrides(config)?;
    }

    let mut base_cfg = with_start_path(&config_root_path, || {
        config.build()?.try_deserialize::<FusionRouterConfig>()
    })?;

    base_cfg.root_directory = config_root_path;

    Ok(base_cfg)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use config::FileFormat;
    use envconfig::Envconfig;

    use crate::{
        env_overrides::EnvVarOverrides,
        log::{LogFormat, LogLevel},
        parse_with_overrides, parse_yaml_config,
        subgraphs::{endpoint_map, SubgraphConfig},
        FusionRouterConfig,
    };

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_yaml_config(String::new()).expect("empty config is valid");

        assert_eq!(config.query_planner.cache_size, 1000);
        assert_eq!(config.traffic_shaping.max_connections_per_host, 100);
        assert_eq!(config.traffic_shaping.timeout, Duration::from_secs(30));
        assert!(!config.execution.show_debug_info);
        assert!(config.subgraphs.is_empty());
        assert!(config.metadata.path.is_none());
    }

    #[test]
    fn reads_yaml_sections() {
        let config = parse_yaml_config(
            r#"
log:
  level: warn
  format: json
query_planner:
  cache_size: 25
traffic_shaping:
  max_connections_per_host: 4
  timeout: 1500ms
execution:
  show_debug_info: true
metadata:
  path: ../query-planner/fixture/tests/products.metadata.json
subgraphs:
  accounts:
    url: http://localhost:4001/graphql
  products:
    url: http://localhost:4003/graphql
"#
            .to_string(),
        )
        .expect("valid config");

        assert_eq!(config.log.level, LogLevel::Warn);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.query_planner.cache_size, 25);
        assert_eq!(config.traffic_shaping.max_connections_per_host, 4);
        assert_eq!(config.traffic_shaping.timeout, Duration::from_millis(1500));
        assert!(config.execution.show_debug_info);
        assert_eq!(
            config.subgraphs.get("accounts"),
            Some(&SubgraphConfig {
                url: "http://localhost:4001/graphql".to_string()
            })
        );
        assert_eq!(endpoint_map(&config.subgraphs).len(), 2);

        let metadata_path = config.metadata.path.expect("metadata path is set");
        assert!(metadata_path.absolute.is_absolute());
        assert!(metadata_path.absolute.ends_with("products.metadata.json"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = parse_yaml_config(
            r#"
query_planner:
  cache_size: 25
  timeout: 10s
"#
            .to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let env = HashMap::from([
            ("LOG_LEVEL".to_string(), "error".to_string()),
            ("LOG_FILTER".to_string(), "fusion_query_planner=trace".to_string()),
            ("QUERY_PLANNER_CACHE_SIZE".to_string(), "7".to_string()),
            ("SHOW_DEBUG_INFO".to_string(), "true".to_string()),
        ]);
        let overrides = EnvVarOverrides::init_from_hashmap(&env).expect("valid env");

        let config = parse_with_overrides(
            r#"{ "log": { "level": "info" }, "query_planner": { "cache_size": 50 } }"#,
            FileFormat::Json,
            Some(overrides),
        )
        .expect("valid config");

        assert_eq!(config.log.level, LogLevel::Error);
        assert_eq!(config.log.env_filter_str(), "fusion_query_planner=trace");
        assert_eq!(config.query_planner.cache_size, 7);
        assert!(config.execution.show_debug_info);
    }

    #[test]
    fn generates_json_schema() {
        let schema = schemars::schema_for!(FusionRouterConfig);
        let schema = serde_json::to_value(&schema).expect("schema serializes");

        let properties = schema["properties"]
            .as_object()
            .expect("object schema with properties");
        for section in [
            "log",
            "metadata",
            "query_planner",
            "traffic_shaping",
            "execution",
            "subgraphs",
        ] {
            assert!(properties.contains_key(section), "missing {}", section);
        }
    }
}
