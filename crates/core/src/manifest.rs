//! Locating and decoding `package.json`.
//!
//! Only the handful of fields that the catalog, the runner detector and the
//! header need are extracted. Everything is decoded leniently: a field with an
//! unexpected shape is treated as absent, except for `scripts` whose shape is
//! validated when the catalog is built.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// How many parent directories are searched above the start directory.
pub const MAX_SEARCH_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Absolute path of the `package.json` this was read from.
    pub path: PathBuf,
    pub name: Option<String>,
    pub package_manager: Option<String>,
    pub workspaces: Vec<String>,
    /// Raw `scripts` value, validated by the catalog builder.
    pub scripts: Option<Value>,
    pub scripts_info: Map<String, Value>,
    pub ntl_descriptions: Map<String, Value>,
}

impl Manifest {
    /// Decodes a manifest from JSON text. `path` is recorded as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or is not a JSON object.
    pub fn from_json_str(path: &Path, content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            Error::json_error("reading", "manifest", &path.display().to_string(), e)
        })?;

        let Value::Object(mut root) = value else {
            return Err(Error::json_error(
                "reading",
                "manifest",
                &path.display().to_string(),
                serde::de::Error::custom("top level value is not an object"),
            ));
        };

        let ntl_descriptions = root
            .get("ntl")
            .and_then(|ntl| ntl.get("descriptions"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Manifest {
            path: path.to_path_buf(),
            name: string_field(&root, "name"),
            package_manager: string_field(&root, "packageManager"),
            workspaces: workspace_globs(root.get("workspaces")),
            scripts: root.remove("scripts"),
            scripts_info: root
                .remove("scripts-info")
                .and_then(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .unwrap_or_default(),
            ntl_descriptions,
        })
    }

    /// Reads and decodes the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or decoded.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io_error("manifest", &path.display().to_string(), e))?;
        Self::from_json_str(path, &content)
    }

    /// Directory containing the manifest, which is where scripts run.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Name shown in the header: the package name, falling back to the
    /// directory name.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.project_dir()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.project_dir().display().to_string())
    }

    pub fn is_workspace_root(&self) -> bool {
        !self.workspaces.is_empty()
    }
}

fn string_field(root: &Map<String, Value>, key: &str) -> Option<String> {
    root.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `workspaces` is either an array of globs or an object with `packages`.
fn workspace_globs(value: Option<&Value>) -> Vec<String> {
    let array = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => match map.get("packages") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    array
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Walks up from `start` looking for a `package.json`.
///
/// `start` may be a directory or a path to a manifest file. At most
/// [`MAX_SEARCH_DEPTH`] parent directories are examined above it.
///
/// # Errors
///
/// Returns [`Error::NoManifest`] if nothing is found, or if `start` doesn't exist.
pub fn find_manifest(start: &Path) -> Result<PathBuf> {
    let no_manifest = || Error::NoManifest {
        start: start.display().to_string(),
    };

    let start = start.canonicalize().map_err(|_| no_manifest())?;

    if start.is_file() {
        return if start.file_name().is_some_and(|n| n == MANIFEST_FILE_NAME) {
            Ok(start)
        } else {
            Err(no_manifest())
        };
    }

    for dir in start.ancestors().take(MAX_SEARCH_DEPTH + 1) {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        debug!("Looking for manifest at `{}`", candidate.display());
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(no_manifest())
}
