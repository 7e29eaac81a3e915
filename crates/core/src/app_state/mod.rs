//! The interactive application state machine.
//!
//! [`AppState`] owns the catalog and history for one project and reacts to
//! decoded keys. Every mutating call returns a fresh [`RenderSnapshot`]; the
//! front end never mutates the state directly and only performs the
//! [`Action`]s it is handed.
//!
//! The visible list is cached. It is recomputed whenever the catalog, the
//! filter query, the sort mode or lifecycle visibility changes, and the
//! selection is clamped into it right after.

mod keys;
pub mod types;

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::debug;

pub use types::{Action, AppMode, Key, RenderSnapshot, RunRequest, SortMode, Update, VisibleEntry};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, Tier};
use crate::history::HistoryStore;
use crate::manifest::MANIFEST_FILE_NAME;
use crate::runner::RunnerKind;
use crate::workspace::Workspace;

pub const MIN_TERMINAL_WIDTH: u16 = 30;
pub const MIN_TERMINAL_HEIGHT: u16 = 8;

/// Grid columns for a terminal width.
pub fn columns_for_width(width: u16) -> usize {
    match width {
        0..=59 => 1,
        60..=89 => 2,
        90..=119 => 3,
        120..=159 => 4,
        _ => 5,
    }
}

/// Startup options that don't change while the application runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub runner: RunnerKind,
    pub sort_mode: SortMode,
    pub include_lifecycle: bool,
    pub search_descriptions: bool,
    pub history_enabled: bool,
    /// Extra arguments passed to every script started from the picker.
    pub default_args: Option<String>,
}

impl AppSettings {
    pub fn from_config(config: &Config, runner: RunnerKind) -> Self {
        AppSettings {
            runner,
            sort_mode: config.general.default_sort,
            include_lifecycle: config.general.show_lifecycle,
            search_descriptions: config.filter.search_descriptions,
            history_enabled: config.history.enabled,
            default_args: None,
        }
    }
}

/// Identifies the project: `key` is the absolute directory used in history,
/// `name` is shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub key: String,
    pub name: String,
}

pub struct AppState {
    catalog: Rc<Catalog>,
    history: HistoryStore,
    project: ProjectInfo,
    settings: AppSettings,
    sort_mode: SortMode,
    include_lifecycle: bool,
    mode: AppMode,
    selected_index: Option<usize>,
    visible_indices: Vec<usize>,
    column_count: usize,
    terminal_too_small: bool,
    workspace: Option<Workspace>,
    clock: fn() -> DateTime<Utc>,
}

/// Label shown for the monorepo root among the workspace choices.
pub const WORKSPACE_ROOT_LABEL: &str = "(root)";

impl AppState {
    pub fn new(
        catalog: Rc<Catalog>,
        history: HistoryStore,
        project: ProjectInfo,
        settings: AppSettings,
    ) -> Self {
        let mut state = AppState {
            catalog,
            history,
            project,
            sort_mode: settings.sort_mode,
            include_lifecycle: settings.include_lifecycle,
            settings,
            mode: AppMode::Normal,
            selected_index: None,
            visible_indices: Vec::new(),
            column_count: 1,
            terminal_too_small: false,
            workspace: None,
            clock: Utc::now,
        };
        state.recompute_visible(true);
        state
    }

    /// Replaces the clock used for history scores and records.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self.recompute_visible(false);
        self
    }

    /// Makes the members of `workspace` reachable with the `w` key.
    #[must_use]
    pub fn with_workspace(mut self, workspace: Option<Workspace>) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    /// Labels and manifest paths of the projects `w` can switch to, the root
    /// first.
    pub fn workspace_choices(&self) -> Vec<(String, PathBuf)> {
        let Some(workspace) = &self.workspace else {
            return Vec::new();
        };
        let root = (
            WORKSPACE_ROOT_LABEL.to_string(),
            workspace.root.join(MANIFEST_FILE_NAME),
        );
        std::iter::once(root)
            .chain(
                workspace
                    .members
                    .iter()
                    .map(|m| (m.name.clone(), m.manifest_path())),
            )
            .collect()
    }

    /// Which workspace choice is the project currently shown.
    fn current_choice(&self) -> usize {
        self.workspace_choices()
            .iter()
            .position(|(_, manifest)| {
                manifest
                    .parent()
                    .is_some_and(|dir| dir.display().to_string() == self.project.key)
            })
            .unwrap_or(0)
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn mode(&self) -> &AppMode {
        &self.mode
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn runner(&self) -> RunnerKind {
        self.settings.runner
    }

    pub fn is_terminal_too_small(&self) -> bool {
        self.terminal_too_small
    }

    fn query(&self) -> &str {
        match &self.mode {
            AppMode::Filter { query } => query,
            _ => "",
        }
    }

    /// Re-filters and re-sorts the visible list, then fixes up the cursor.
    /// `reset_cursor` moves it back to the first entry.
    fn recompute_visible(&mut self, reset_cursor: bool) {
        let entries = self.catalog.entries();
        let ranked = filter::rank(self.query(), entries, self.settings.search_descriptions);

        let mut visible: Vec<(usize, Tier)> = ranked
            .iter()
            .filter(|r| self.include_lifecycle || !r.entry.is_lifecycle)
            .map(|r| (r.index, r.tier))
            .collect();

        // Sorting applies within a match tier so better matches stay on top.
        match self.sort_mode {
            SortMode::Recent => {
                let now = (self.clock)();
                let scores: HashMap<usize, f64> = visible
                    .iter()
                    .map(|(i, _)| {
                        let score = self
                            .history
                            .score(&self.project.key, &entries[*i].name, now);
                        (*i, score)
                    })
                    .collect();
                visible.sort_by(|(a, a_tier), (b, b_tier)| {
                    a_tier
                        .cmp(b_tier)
                        .then_with(|| scores[b].total_cmp(&scores[a]))
                });
            }
            SortMode::Alpha => visible.sort_by(|(a, a_tier), (b, b_tier)| {
                let (a, b) = (&entries[*a], &entries[*b]);
                a_tier
                    .cmp(b_tier)
                    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                    .then_with(|| a.name.cmp(&b.name))
            }),
            SortMode::Category => visible.sort_by(|(a, a_tier), (b, b_tier)| {
                let (a, b) = (&entries[*a], &entries[*b]);
                a_tier
                    .cmp(b_tier)
                    .then_with(|| a.category().to_lowercase().cmp(&b.category().to_lowercase()))
                    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }

        self.visible_indices = visible.into_iter().map(|(i, _)| i).collect();

        let last = self.visible_indices.len().checked_sub(1);
        self.selected_index = match (last, self.selected_index) {
            (None, _) => None,
            (Some(_), None) => Some(0),
            (Some(_), Some(_)) if reset_cursor => Some(0),
            (Some(last), Some(current)) => Some(current.min(last)),
        };
    }

    fn request_for(&self, catalog_index: usize, args: Option<&str>) -> Result<RunRequest> {
        let entry = self
            .catalog
            .get(catalog_index)
            .ok_or_else(|| Error::ScriptNotFound {
                name: format!("#{catalog_index}"),
                suggestions: Vec::new(),
            })?;
        Ok(RunRequest {
            script: entry.name.clone(),
            args: args.map(str::to_string),
            command_line: self.settings.runner.command_line(&entry.name, args)?,
        })
    }

    fn requests_for(&self, catalog_indices: &[usize]) -> Result<Vec<RunRequest>> {
        let args = self.settings.default_args.as_deref();
        catalog_indices
            .iter()
            .map(|i| self.request_for(*i, args))
            .collect()
    }

    /// Builds a run action, or switches to error mode when the command line
    /// can't be rendered.
    fn run_action(&mut self, requests: Result<Vec<RunRequest>>) -> Option<Action> {
        match requests {
            Ok(requests) if requests.is_empty() => None,
            Ok(requests) => Some(Action::Run(requests)),
            Err(e) => {
                self.set_error(&e);
                None
            }
        }
    }

    /// Request for the last script run in this project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHistory`] if nothing ran here yet, and
    /// [`Error::ScriptNotFound`] if that script is no longer in the catalog.
    pub fn rerun_last(&self) -> Result<RunRequest> {
        let (script, args) = self
            .history
            .last(&self.project.key)
            .ok_or(Error::NoHistory)?;

        let index = self
            .catalog
            .position(&script)
            .ok_or_else(|| Error::ScriptNotFound {
                suggestions: self.catalog.suggestions(&script),
                name: script.clone(),
            })?;

        self.request_for(index, args.as_deref())
    }

    /// Request for a script looked up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptNotFound`], with suggestions, for unknown names.
    pub fn request_named(&self, name: &str, args: Option<&str>) -> Result<RunRequest> {
        let index = self
            .catalog
            .position(name)
            .ok_or_else(|| Error::ScriptNotFound {
                name: name.to_string(),
                suggestions: self.catalog.suggestions(name),
            })?;
        self.request_for(index, args)
    }

    fn set_error(&mut self, error: &Error) {
        self.mode = AppMode::Error {
            message: error.to_string(),
        };
        self.recompute_visible(false);
    }

    /// Shows `error` in error mode.
    pub fn report_failure(&mut self, error: &Error) -> RenderSnapshot {
        self.set_error(error);
        self.snapshot()
    }

    /// Applies a new terminal size.
    pub fn resize(&mut self, width: u16, height: u16) -> RenderSnapshot {
        self.column_count = columns_for_width(width);
        self.terminal_too_small = width < MIN_TERMINAL_WIDTH || height < MIN_TERMINAL_HEIGHT;
        if self.terminal_too_small {
            debug!("{}", self.too_small_error(width, height));
        }
        self.snapshot()
    }

    pub fn too_small_error(&self, width: u16, height: u16) -> Error {
        Error::TerminalTooSmall {
            width,
            height,
            min_width: MIN_TERMINAL_WIDTH,
            min_height: MIN_TERMINAL_HEIGHT,
        }
    }

    /// Swaps in a reloaded catalog. A failed reload keeps the current catalog
    /// and shows the error.
    pub fn replace_catalog(&mut self, catalog: Result<Catalog>) -> RenderSnapshot {
        match catalog {
            Ok(catalog) => {
                debug!("Catalog replaced, {} scripts", catalog.len());
                self.catalog = Rc::new(catalog);
                if matches!(self.mode, AppMode::MultiSelect { .. }) {
                    self.mode = AppMode::Normal;
                }
                self.recompute_visible(false);
            }
            Err(e) => self.set_error(&e),
        }
        self.snapshot()
    }

    /// Shows another project, typically a workspace member, keeping the
    /// history, settings and sort mode.
    pub fn switch_project(&mut self, catalog: Catalog, project: ProjectInfo) -> RenderSnapshot {
        debug!("Switched to `{}`, {} scripts", project.key, catalog.len());
        self.catalog = Rc::new(catalog);
        self.project = project;
        self.mode = AppMode::Normal;
        self.recompute_visible(true);
        self.snapshot()
    }

    /// Arguments offered when args entry opens: the ones last used with the
    /// script, else the startup default.
    fn args_prefill(&self, catalog_index: usize) -> String {
        let Some(entry) = self.catalog.get(catalog_index) else {
            return String::new();
        };
        self.history
            .script(&self.project.key, &entry.name)
            .and_then(|r| r.last_args.clone())
            .or_else(|| self.settings.default_args.clone())
            .unwrap_or_default()
    }

    /// Records a completed run in history, whatever its outcome.
    pub fn record_execution(&mut self, request: &RunRequest) -> RenderSnapshot {
        if self.settings.history_enabled {
            let now = (self.clock)();
            self.history
                .record(&self.project.key, &request.script, request.args.as_deref(), now);
            self.recompute_visible(false);
        }
        self.snapshot()
    }

    /// Writes history to disk. A no-op when history is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the history file can't be written.
    pub fn persist_history(&mut self) -> Result<()> {
        if !self.settings.history_enabled {
            return Ok(());
        }
        self.history.persist()
    }

    fn header(&self) -> String {
        let visible = self.visible_indices.len();
        let total = self.catalog.len();
        let count = if visible == total {
            format!("{total} scripts")
        } else {
            format!("{visible}/{total} scripts")
        };
        format!(
            "{} ({}) | {} | sort: {}",
            self.project.name, self.settings.runner, count, self.sort_mode
        )
    }

    fn status(&self) -> String {
        match &self.mode {
            AppMode::Normal => match self.selected_index {
                Some(i) => format!("{}/{}", i + 1, self.visible_indices.len()),
                None => "No scripts to show".to_string(),
            },
            AppMode::Filter { .. } if self.visible_indices.is_empty() => {
                "No matching scripts".to_string()
            }
            AppMode::Filter { .. } => format!("{} matches", self.visible_indices.len()),
            AppMode::MultiSelect { selected } => format!("{} selected", selected.len()),
            AppMode::Args { catalog_index, .. } => match self.catalog.get(*catalog_index) {
                Some(entry) => format!("Arguments for `{}`", entry.name),
                None => "Arguments".to_string(),
            },
            AppMode::WorkspaceSelect { cursor } => {
                format!("{}/{} projects", cursor + 1, self.workspace_choices().len())
            }
            AppMode::Help => "Press any key to return".to_string(),
            AppMode::Error { .. } => "Press any key to continue".to_string(),
        }
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let marked = |catalog_index: &usize| match &self.mode {
            AppMode::MultiSelect { selected } => selected.contains(catalog_index),
            _ => false,
        };

        let entries = self
            .visible_indices
            .iter()
            .enumerate()
            .filter_map(|(position, catalog_index)| {
                let entry = self.catalog.get(*catalog_index)?;
                Some(VisibleEntry {
                    catalog_index: *catalog_index,
                    position: position + 1,
                    name: entry.name.clone(),
                    command: entry.command.clone(),
                    description: entry.description.clone(),
                    is_lifecycle: entry.is_lifecycle,
                    group: entry.group.clone(),
                    marked: marked(catalog_index),
                })
            })
            .collect();

        RenderSnapshot {
            mode: self.mode.clone(),
            entries,
            selected: self.selected_index,
            sort_mode: self.sort_mode,
            runner: self.settings.runner,
            column_count: self.column_count,
            header: self.header(),
            status: self.status(),
            query: match &self.mode {
                AppMode::Filter { query } => Some(query.clone()),
                _ => None,
            },
            include_lifecycle: self.include_lifecycle,
            terminal_too_small: self.terminal_too_small,
            total_count: self.catalog.len(),
            workspace_choices: match &self.mode {
                AppMode::WorkspaceSelect { .. } => self
                    .workspace_choices()
                    .into_iter()
                    .map(|(label, _)| label)
                    .collect(),
                _ => Vec::new(),
            },
        }
    }
}
