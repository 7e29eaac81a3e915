use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use leon::Template;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// Lock files checked in order, first present wins.
pub const LOCK_FILES: [(&str, RunnerKind); 4] = [
    ("bun.lockb", RunnerKind::Bun),
    ("pnpm-lock.yaml", RunnerKind::Pnpm),
    ("yarn.lock", RunnerKind::Yarn),
    ("package-lock.json", RunnerKind::Npm),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl RunnerKind {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerKind::Npm => "npm",
            RunnerKind::Yarn => "yarn",
            RunnerKind::Pnpm => "pnpm",
            RunnerKind::Bun => "bun",
        }
    }

    /// Command template without and with extra arguments.
    pub fn templates(&self) -> (&'static str, &'static str) {
        match self {
            RunnerKind::Npm => ("npm run {script}", "npm run {script} -- {args}"),
            RunnerKind::Yarn => ("yarn {script}", "yarn {script} {args}"),
            RunnerKind::Pnpm => ("pnpm {script}", "pnpm {script} {args}"),
            RunnerKind::Bun => ("bun run {script}", "bun run {script} {args}"),
        }
    }

    /// Renders the shell command line that runs `script`.
    ///
    /// The script name is shell-quoted when it needs to be. `args` is shell
    /// text typed by the user and goes in as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the name holds a nul byte, or if the template
    /// can't be parsed or rendered.
    pub fn command_line(&self, script: &str, args: Option<&str>) -> Result<String> {
        let (plain, with_args) = self.templates();
        let quoted =
            shlex::try_quote(script).map_err(|_| Error::UnquotableScript(script.to_string()))?;
        let mut context: HashMap<&str, &str> = HashMap::from([("script", quoted.as_ref())]);

        let template = match args.map(str::trim).filter(|a| !a.is_empty()) {
            Some(args) => {
                context.insert("args", args);
                Template::parse(with_args)?
            }
            None => Template::parse(plain)?,
        };

        Ok(template.render(&context)?)
    }
}

impl Display for RunnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunnerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "npm" => Ok(RunnerKind::Npm),
            "yarn" => Ok(RunnerKind::Yarn),
            "pnpm" => Ok(RunnerKind::Pnpm),
            "bun" => Ok(RunnerKind::Bun),
            other => Err(format!("unknown runner `{other}`")),
        }
    }
}

/// Reads `<name>@<version>`, ignoring the version.
fn from_package_manager_field(field: &str) -> Option<RunnerKind> {
    field.split('@').next().and_then(|name| name.parse().ok())
}

/// Picks the package manager for a project along with why it was chosen.
pub fn detect_with_reason(
    project_dir: &Path,
    manifest: Option<&Manifest>,
    cli_override: Option<RunnerKind>,
    config_override: Option<RunnerKind>,
) -> (RunnerKind, String) {
    if let Some(runner) = cli_override {
        return (runner, "command line override".to_string());
    }

    if let Some(runner) = config_override {
        return (runner, "configuration".to_string());
    }

    if let Some(field) = manifest.and_then(|m| m.package_manager.as_deref()) {
        if let Some(runner) = from_package_manager_field(field) {
            return (runner, format!("packageManager field `{field}`"));
        }
    }

    for (lock_file, runner) in LOCK_FILES {
        if project_dir.join(lock_file).is_file() {
            return (runner, format!("lock file `{lock_file}`"));
        }
    }

    (RunnerKind::Npm, "default".to_string())
}

pub fn detect(
    project_dir: &Path,
    manifest: Option<&Manifest>,
    cli_override: Option<RunnerKind>,
    config_override: Option<RunnerKind>,
) -> RunnerKind {
    detect_with_reason(project_dir, manifest, cli_override, config_override).0
}
