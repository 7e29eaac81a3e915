//! Monorepo member discovery.
//!
//! Member globs come from `pnpm-workspace.yaml`, then `lerna.json`, then the
//! manifest's own `workspaces` field. Each glob is expanded relative to the
//! root and every matching directory holding a `package.json` is a member.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};

pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";
pub const LERNA_FILE: &str = "lerna.json";
const LERNA_DEFAULT_PACKAGES: &str = "packages/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Pnpm,
    Lerna,
    /// The `workspaces` field used by npm, yarn and bun.
    Manifest,
}

impl Display for WorkspaceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WorkspaceKind::Pnpm => "pnpm",
            WorkspaceKind::Lerna => "lerna",
            WorkspaceKind::Manifest => "package.json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMember {
    /// Package name, or the directory name when the package has none.
    pub name: String,
    pub dir: PathBuf,
}

impl WorkspaceMember {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }
}

/// The members of a monorepo root, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub kind: WorkspaceKind,
    pub root: PathBuf,
    pub members: Vec<WorkspaceMember>,
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Deserialize)]
struct LernaConfig {
    packages: Option<Vec<String>>,
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::io_error("workspace", &path.display().to_string(), e))
}

fn workspace_file_error(path: &Path, message: impl Display) -> Error {
    Error::WorkspaceFile {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Where the member globs for `manifest`'s project come from, and the globs.
///
/// # Errors
///
/// Returns an error if a workspace file exists but can't be read or decoded.
pub fn member_patterns(manifest: &Manifest) -> Result<Option<(WorkspaceKind, Vec<String>)>> {
    let root = manifest.project_dir();

    let pnpm = root.join(PNPM_WORKSPACE_FILE);
    if pnpm.is_file() {
        let config: PnpmWorkspace = serde_yaml::from_str(&read_file(&pnpm)?)
            .map_err(|e| workspace_file_error(&pnpm, e))?;
        return Ok(Some((WorkspaceKind::Pnpm, config.packages)));
    }

    let lerna = root.join(LERNA_FILE);
    if lerna.is_file() {
        let config: LernaConfig = serde_json::from_str(&read_file(&lerna)?)
            .map_err(|e| workspace_file_error(&lerna, e))?;
        let packages = config
            .packages
            .unwrap_or_else(|| vec![LERNA_DEFAULT_PACKAGES.to_string()]);
        return Ok(Some((WorkspaceKind::Lerna, packages)));
    }

    if manifest.is_workspace_root() {
        return Ok(Some((WorkspaceKind::Manifest, manifest.workspaces.clone())));
    }

    Ok(None)
}

fn member_name(dir: &Path) -> String {
    Manifest::load(&dir.join(MANIFEST_FILE_NAME))
        .ok()
        .and_then(|m| m.name)
        .or_else(|| dir.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| dir.display().to_string())
}

/// Expands member globs under `root`. Negated globs (`!pattern`) are ignored,
/// as are directories without a `package.json`.
pub fn resolve_members(root: &Path, patterns: &[String]) -> Vec<WorkspaceMember> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
        let full = root.join(pattern.trim_end_matches('/'));
        let paths = match glob::glob(&full.to_string_lossy()) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Ignoring workspace pattern `{pattern}`: {e}");
                continue;
            }
        };

        for dir in paths.flatten() {
            if !dir.is_dir() || !dir.join(MANIFEST_FILE_NAME).is_file() {
                continue;
            }
            if seen.insert(dir.clone()) {
                members.push(WorkspaceMember {
                    name: member_name(&dir),
                    dir,
                });
            }
        }
    }

    members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.dir.cmp(&b.dir)));
    members
}

/// The workspace rooted at `manifest`'s directory, if it is a monorepo root
/// with at least one member.
///
/// # Errors
///
/// Returns an error if a workspace file can't be read or decoded.
pub fn discover(manifest: &Manifest) -> Result<Option<Workspace>> {
    let Some((kind, patterns)) = member_patterns(manifest)? else {
        return Ok(None);
    };

    let root = manifest.project_dir().to_path_buf();
    let members = resolve_members(&root, &patterns);
    debug!(
        "{kind} workspace at `{}` with {} members",
        root.display(),
        members.len()
    );
    if members.is_empty() {
        return Ok(None);
    }

    Ok(Some(Workspace {
        kind,
        root,
        members,
    }))
}
