//! Command-line argument parsing.
//!
//! This module defines the command-line interface of the `nrs` binary using
//! the `clap` crate.

use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use nrs_core::app_state::SortMode;
use nrs_core::runner::RunnerKind;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Recent,
    Alpha,
    Category,
}

impl From<SortArg> for SortMode {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Recent => SortMode::Recent,
            SortArg::Alpha => SortMode::Alpha,
            SortArg::Category => SortMode::Category,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerArg {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl From<RunnerArg> for RunnerKind {
    fn from(value: RunnerArg) -> Self {
        match value {
            RunnerArg::Npm => RunnerKind::Npm,
            RunnerArg::Yarn => RunnerKind::Yarn,
            RunnerArg::Pnpm => RunnerKind::Pnpm,
            RunnerArg::Bun => RunnerKind::Bun,
        }
    }
}

/// What the invocation asks for, derived from the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Interactive,
    List,
    Last,
    Script(String),
}

/// Command-line arguments for the nrs script runner.
///
/// Without flags an interactive picker is shown for the scripts of the
/// nearest `package.json`.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use nrs_cli::cli_args::Args;
///
/// let args = Args::parse_from(["nrs", "--list"]);
/// assert!(args.list);
/// ```
#[derive(Parser, Debug)]
#[command(name = "nrs", version, about = "Pick and run package.json scripts")]
#[command(term_width = 0)] // Just to make testing across clap features easier
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Directory to search for `package.json` from, walking up parent directories.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rerun the last script run in this project without showing the picker.
    #[arg(long, short = 'L', action, conflicts_with_all = ["list", "script"])]
    pub last: bool,

    /// Print the scripts and exit.
    #[arg(long, short = 'l', action, conflicts_with = "script")]
    pub list: bool,

    /// Hide scripts whose name matches this glob (`*`, `?` and `[...]`).
    ///
    /// Can be given more than once. Added to the patterns from configuration.
    #[arg(long, short = 'e', action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Initial sort order for the picker.
    #[arg(long, short = 's', value_enum)]
    pub sort: Option<SortArg>,

    /// Package manager to use instead of detecting one.
    #[arg(long, short = 'r', value_enum)]
    pub runner: Option<RunnerArg>,

    /// Extra arguments passed to the script.
    ///
    /// # Examples
    /// ```bash
    /// nrs -n test -a "--watch --coverage"
    /// ```
    #[arg(long, short = 'a', allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Run this script directly. Configured aliases are accepted.
    #[arg(long, short = 'n')]
    pub script: Option<String>,

    /// Print the command that would run instead of running it.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// Extra configuration file, applied over the user and project files.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Ignore all configuration files.
    #[arg(long, action, conflicts_with = "config")]
    pub no_config: bool,

    /// Log debug information to stderr.
    #[arg(long, action)]
    pub debug: bool,

    /// Print a completion script for this shell and exit.
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        if self.list {
            RunMode::List
        } else if self.last {
            RunMode::Last
        } else if let Some(script) = &self.script {
            RunMode::Script(script.clone())
        } else {
            RunMode::Interactive
        }
    }

    /// Writes the completion script for `shell`.
    pub fn write_completions(shell: Shell, out: &mut impl Write) {
        clap_complete::generate(shell, &mut Args::command(), "nrs", out);
    }

    /// Log filter used when `RUST_LOG` isn't set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "warn"
        }
    }
}
