//! Script catalog construction.
//!
//! A [`Catalog`] is the ordered, immutable set of runnable entries taken from a
//! manifest's `scripts` map. Comment keys (`//dev`, `// dev`, `dev//`) carry
//! descriptions and are never entries themselves.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use glob::Pattern;
use indexmap::IndexMap;
use log::warn;
use serde_json::Value;

use crate::error::ParseError;
use crate::filter;
use crate::manifest::Manifest;

/// Scripts the package manager runs on its own during install/publish/version.
pub const LIFECYCLE_SCRIPTS: [&str; 13] = [
    "preinstall",
    "install",
    "postinstall",
    "preuninstall",
    "uninstall",
    "postuninstall",
    "prepublish",
    "prepublishOnly",
    "publish",
    "postpublish",
    "preversion",
    "version",
    "postversion",
];

const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub name: String,
    pub command: String,
    pub description: Option<String>,
    pub is_lifecycle: bool,
    /// Base script for `pre<X>`/`post<X>` variants.
    pub group: Option<String>,
}

impl ScriptEntry {
    pub fn new(name: &str, command: &str) -> Self {
        ScriptEntry {
            name: name.to_string(),
            command: command.to_string(),
            description: None,
            is_lifecycle: is_lifecycle(name),
            group: None,
        }
    }

    /// Clustering key for category ordering: the group if any, otherwise the
    /// part of the name before the first `:`.
    pub fn category(&self) -> &str {
        if let Some(group) = &self.group {
            return group;
        }
        self.name.split(':').next().unwrap_or(&self.name)
    }
}

impl Display for ScriptEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.name, description),
            None => write!(f, "{}", self.name),
        }
    }
}

pub fn is_lifecycle(name: &str) -> bool {
    LIFECYCLE_SCRIPTS.contains(&name)
}

/// Keys that only carry a description for another script.
pub fn is_comment_key(key: &str) -> bool {
    key.starts_with("//") || key.ends_with("//")
}

type DescriptionSource = fn(&Manifest, &IndexMap<String, String>, &str) -> Option<String>;

fn from_scripts_info(
    manifest: &Manifest,
    _scripts: &IndexMap<String, String>,
    name: &str,
) -> Option<String> {
    manifest
        .scripts_info
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn from_ntl(manifest: &Manifest, _scripts: &IndexMap<String, String>, name: &str) -> Option<String> {
    manifest
        .ntl_descriptions
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn from_comment_key(
    _manifest: &Manifest,
    scripts: &IndexMap<String, String>,
    name: &str,
) -> Option<String> {
    [format!("//{name}"), format!("// {name}"), format!("{name}//")]
        .iter()
        .find_map(|key| scripts.get(key))
        .cloned()
}

/// Checked in order; the first source with text wins.
const DESCRIPTION_SOURCES: [DescriptionSource; 3] =
    [from_scripts_info, from_ntl, from_comment_key];

fn resolve_description(
    manifest: &Manifest,
    scripts: &IndexMap<String, String>,
    name: &str,
) -> Option<String> {
    DESCRIPTION_SOURCES
        .iter()
        .find_map(|source| source(manifest, scripts, name))
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn decode_scripts(value: Option<&Value>) -> Result<IndexMap<String, String>, ParseError> {
    let Some(value) = value else {
        return Ok(IndexMap::new());
    };

    let Value::Object(map) = value else {
        return Err(ParseError::Malformed(
            "expected an object mapping script names to commands".to_string(),
        ));
    };

    map.iter()
        .map(|(name, command)| match command {
            Value::String(command) => Ok((name.clone(), command.clone())),
            _ => Err(ParseError::Malformed(format!(
                "command for `{name}` is not a string"
            ))),
        })
        .collect()
}

fn group_for(name: &str, scripts: &IndexMap<String, String>) -> Option<String> {
    ["pre", "post"].iter().find_map(|prefix| {
        name.strip_prefix(prefix)
            .filter(|base| !base.is_empty() && !is_comment_key(base))
            .filter(|base| scripts.contains_key(*base))
            .map(str::to_string)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ScriptEntry>,
}

impl Catalog {
    /// Builds the catalog for a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] if `scripts` isn't a string map, and
    /// [`ParseError::NoScripts`] if no runnable entries remain.
    pub fn build(manifest: &Manifest) -> Result<Self, ParseError> {
        let scripts = decode_scripts(manifest.scripts.as_ref())?;

        let entries = scripts
            .iter()
            .filter(|(name, _)| !is_comment_key(name))
            .map(|(name, command)| ScriptEntry {
                description: resolve_description(manifest, &scripts, name),
                group: group_for(name, &scripts),
                ..ScriptEntry::new(name, command)
            })
            .collect();

        Self::from_entries(entries)
    }

    /// # Errors
    ///
    /// Returns an error on duplicate names or an empty list.
    pub fn from_entries(entries: Vec<ScriptEntry>) -> Result<Self, ParseError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ParseError::DuplicateScript(entry.name.clone()));
            }
        }

        if entries.is_empty() {
            return Err(ParseError::NoScripts);
        }

        Ok(Catalog { entries })
    }

    /// A new catalog without entries whose name matches any glob in `patterns`.
    /// Invalid patterns are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NoScripts`] if every entry was excluded.
    pub fn without_matching(&self, patterns: &[String]) -> Result<Self, ParseError> {
        if patterns.is_empty() {
            return Ok(self.clone());
        }

        let compiled: Vec<Pattern> = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring exclude pattern `{p}`: {e}");
                    None
                }
            })
            .collect();

        let entries = self
            .entries
            .iter()
            .filter(|e| !compiled.iter().any(|p| p.matches(&e.name)))
            .cloned()
            .collect();

        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScriptEntry> {
        self.entries.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&ScriptEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Closest names to `name`, for "did you mean" messages.
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        filter::rank(name, &self.entries, false)
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|r| r.entry.name.clone())
            .collect()
    }
}
