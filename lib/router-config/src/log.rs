use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// The level of logging to use. Defaults to `info`.
    ///
    /// Can also be set via the `LOG_LEVEL` environment variable.
    #[serde(default)]
    pub level: LogLevel,

    /// The format of the log messages. Defaults to `pretty-compact`.
    ///
    /// Can also be set via the `LOG_FORMAT` environment variable.
    #[serde(default)]
    pub format: LogFormat,

    /// A `tracing` filter directive, e.g. `fusion_plan_executor=trace`. Takes precedence over `level`.
    ///
    /// Can also be set via the `LOG_FILTER` environment variable.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn env_filter_str(&self) -> &str {
        self.filter.as_deref().unwrap_or(self.level.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Hierarchical output that follows span nesting. Useful when reading plan execution.
    PrettyTree,
    #[default]
    PrettyCompact,
    Json,
}

impl LogFormat {
    const ALL: [LogFormat; 3] = [LogFormat::PrettyTree, LogFormat::PrettyCompact, LogFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::PrettyTree => "pretty-tree",
            LogFormat::PrettyCompact => "pretty-compact",
            LogFormat::Json => "json",
        }
    }
}

// Environment overrides are parsed by name, case-insensitively.
fn parse_by_name<T: Copy>(
    all: &[T],
    name: fn(&T) -> &'static str,
    value: &str,
    kind: &str,
) -> Result<T, String> {
    all.iter()
        .copied()
        .find(|candidate| name(candidate).eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("Invalid log {}: {}", kind, value))
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_by_name(&LogLevel::ALL, LogLevel::as_str, s, "level")
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_by_name(&LogFormat::ALL, LogFormat::as_str, s, "format")
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, LogLevel, LoggingConfig};

    #[test]
    fn filter_wins_over_level() {
        let mut config = LoggingConfig {
            level: LogLevel::Warn,
            ..Default::default()
        };
        assert_eq!(config.env_filter_str(), "warn");

        config.filter = Some("fusion_plan_executor=trace".to_string());
        assert_eq!(config.env_filter_str(), "fusion_plan_executor=trace");
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!("Json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty-Tree".parse::<LogFormat>(), Ok(LogFormat::PrettyTree));
        assert_eq!(
            "loud".parse::<LogLevel>(),
            Err("Invalid log level: loud".to_string())
        );
    }

    #[test]
    fn serde_names_match_parsed_names() {
        for format in LogFormat::ALL {
            let serialized = serde_json::to_value(format).unwrap();
            assert_eq!(serialized, format.as_str());
        }
        for level in LogLevel::ALL {
            let serialized = serde_json::to_value(level).unwrap();
            assert_eq!(serialized, level.as_str());
        }
    }
}
