//! Type definitions shared between the state machine and its front end.
//!
//! The terminal layer decodes raw events into [`Key`]s, feeds them to the
//! state machine, and draws the [`RenderSnapshot`] it gets back.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use indexmap::IndexSet;
use serde::Deserialize;

use crate::runner::RunnerKind;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    /// A letter pressed with Control held.
    Ctrl(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Most used and most recently run first.
    #[default]
    Recent,
    Alpha,
    Category,
}

impl SortMode {
    /// The next mode in the `s` key cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            SortMode::Recent => SortMode::Alpha,
            SortMode::Alpha => SortMode::Category,
            SortMode::Category => SortMode::Recent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Recent => "recent",
            SortMode::Alpha => "alpha",
            SortMode::Category => "category",
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    Normal,
    Filter {
        query: String,
    },
    /// Catalog indices in the order they were picked.
    MultiSelect {
        selected: IndexSet<usize>,
    },
    /// Editing extra arguments for one script before running it.
    Args {
        catalog_index: usize,
        input: String,
    },
    /// Picking a monorepo member. `cursor` indexes the workspace choices, the
    /// root first.
    WorkspaceSelect {
        cursor: usize,
    },
    Help,
    Error {
        message: String,
    },
}

impl AppMode {
    pub fn name(&self) -> &'static str {
        match self {
            AppMode::Normal => "normal",
            AppMode::Filter { .. } => "filter",
            AppMode::MultiSelect { .. } => "multi-select",
            AppMode::Args { .. } => "args",
            AppMode::WorkspaceSelect { .. } => "workspace",
            AppMode::Help => "help",
            AppMode::Error { .. } => "error",
        }
    }
}

/// One script to run, with its fully rendered command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub script: String,
    pub args: Option<String>,
    pub command_line: String,
}

/// What the front end should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run these in order, stopping at the first failure.
    Run(Vec<RunRequest>),
    /// Re-read the manifest and hand the result to `replace_catalog`.
    Refresh,
    /// Load the project at this manifest and hand it to `switch_project`.
    SwitchProject(PathBuf),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleEntry {
    pub catalog_index: usize,
    /// 1-based position in the visible list, the quick-select number.
    pub position: usize,
    pub name: String,
    pub command: String,
    pub description: Option<String>,
    pub is_lifecycle: bool,
    pub group: Option<String>,
    /// Picked in multi-select mode.
    pub marked: bool,
}

/// Immutable view of the application for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub mode: AppMode,
    pub entries: Vec<VisibleEntry>,
    /// Cursor into `entries`; `None` when nothing is visible.
    pub selected: Option<usize>,
    pub sort_mode: SortMode,
    pub runner: RunnerKind,
    pub column_count: usize,
    pub header: String,
    pub status: String,
    pub query: Option<String>,
    pub include_lifecycle: bool,
    pub terminal_too_small: bool,
    pub total_count: usize,
    /// Labels of the workspace choices while picking one, otherwise empty.
    pub workspace_choices: Vec<String>,
}

impl RenderSnapshot {
    pub fn selected_entry(&self) -> Option<&VisibleEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub snapshot: RenderSnapshot,
    pub action: Option<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_mode_cycles() {
        let order: Vec<SortMode> = std::iter::successors(Some(SortMode::Recent), |m| {
            Some(m.next())
        })
        .take(4)
        .collect();
        assert_eq!(
            order,
            vec![
                SortMode::Recent,
                SortMode::Alpha,
                SortMode::Category,
                SortMode::Recent
            ]
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(AppMode::default().name(), "normal");
        assert_eq!(
            AppMode::Filter {
                query: "x".to_string()
            }
            .name(),
            "filter"
        );
        assert_eq!(format!("{}", SortMode::Category), "category");
    }
}
