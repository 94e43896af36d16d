use std::{
    cell::RefCell,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use schemars::{json_schema, JsonSchema};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// A path written relative to the configuration file, resolved while the configuration is read.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FilePath {
    pub relative: String,
    #[serde(skip)]
    pub absolute: PathBuf,
}

// Deserialization has no way to receive the configuration's directory, so it travels through a thread local.
thread_local!(static CONTEXT_START_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) });

pub fn with_start_path<F, T>(start_path: &Path, f: F) -> T
where
    F: FnOnce() -> T,
{
    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = Some(start_path.to_path_buf());
    });

    let result = f();

    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = None;
    });

    result
}

impl JsonSchema for FilePath {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "FilePath".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        json_schema!({
            "type": "string",
            "format": "path"
        })
    }

    fn inline_schema() -> bool {
        true
    }
}

struct FilePathVisitor;

impl<'de> Visitor<'de> for FilePathVisitor {
    type Value = FilePath;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing a relative file path")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        CONTEXT_START_PATH.with(|ctx| {
            if let Some(start_path) = ctx.borrow().as_ref() {
                FilePath::resolve_relative(start_path, v)
                    .map_err(|err| E::custom(format!("Failed to canonicalize path \"{}\": {}", v, err)))
            } else {
                Err(E::custom(
                    "FilePath deserialization context (start_path) is not set",
                ))
            }
        })
    }
}

impl<'de> Deserialize<'de> for FilePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(FilePathVisitor)
    }
}

impl FilePath {
    fn resolve_relative(base_path: &Path, relative_path: &str) -> io::Result<FilePath> {
        Ok(FilePath {
            relative: relative_path.to_string(),
            absolute: fs::canonicalize(base_path.join(relative_path))?,
        })
    }
}
