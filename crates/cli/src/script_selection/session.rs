use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, event, execute, terminal};
use log::{debug, warn};
use nrs_core::app_state::{Action, AppState, ProjectInfo, RenderSnapshot};
use nrs_core::catalog::Catalog;
use nrs_core::config::Theme;
use nrs_core::error::{Error, Result, EXIT_INTERRUPTED, EXIT_SCRIPT_FAILED, EXIT_SUCCESS};
use nrs_core::manifest::Manifest;

use super::colors::Palette;
use super::input::decode_event;
use super::types::{InputEvent, ViewportState};
use super::ui;
use crate::runs::{print_dry_run, run_requests, BatchOutcome};
use crate::signals::SignalFlags;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns raw mode and the alternate screen. Both are released on drop, so an
/// error anywhere in the session leaves the terminal usable.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        let mut guard = TerminalGuard { active: false };
        guard.resume()?;
        Ok(guard)
    }

    /// Hands the terminal back for a script to run in the foreground.
    pub fn suspend(&mut self) -> Result<()> {
        if self.active {
            execute!(stdout(), cursor::Show, LeaveAlternateScreen)?;
            disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if !self.active {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
            self.active = true;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
            let _ = execute!(stdout(), cursor::Show, LeaveAlternateScreen);
        }
    }
}

/// Inputs the picker needs besides the state machine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub manifest_path: PathBuf,
    pub project_dir: PathBuf,
    /// Patterns applied again when the catalog is reloaded.
    pub exclude: Vec<String>,
    pub theme: Theme,
    pub dry_run: bool,
}

/// Where the picker goes once a batch has finished.
#[derive(Debug)]
enum AfterBatch {
    Exit(u8),
    /// Back to the list, showing `error`. `exit_code` is what quitting
    /// afterwards reports.
    Resume { error: Option<Error>, exit_code: u8 },
}

fn after_batch(result: Result<BatchOutcome>) -> AfterBatch {
    match result {
        Ok(BatchOutcome::Completed) => AfterBatch::Exit(EXIT_SUCCESS),
        Ok(outcome) => AfterBatch::Resume {
            error: outcome.as_error(),
            exit_code: outcome.exit_code(),
        },
        Err(e) => AfterBatch::Resume {
            error: Some(e),
            exit_code: EXIT_SCRIPT_FAILED,
        },
    }
}

/// The interactive picker: draws snapshots, feeds keys to the state machine
/// and carries out the actions it returns.
pub struct Session<'a> {
    state: AppState,
    config: SessionConfig,
    palette: Palette,
    signals: &'a SignalFlags,
    /// Exit code of the last batch that didn't complete.
    last_failure: Option<u8>,
}

impl<'a> Session<'a> {
    pub fn new(state: AppState, config: SessionConfig, signals: &'a SignalFlags) -> Self {
        let palette = Palette::for_theme(config.theme);
        Session {
            state,
            config,
            palette,
            signals,
            last_failure: None,
        }
    }

    fn load_catalog(&self, manifest: &Manifest) -> Result<Catalog> {
        let catalog = Catalog::build(manifest)?;
        Ok(catalog.without_matching(&self.config.exclude)?)
    }

    fn reload_catalog(&self) -> Result<Catalog> {
        self.load_catalog(&Manifest::load(&self.config.manifest_path)?)
    }

    /// Loads the project at `manifest_path` and makes it the one scripts run
    /// in. On error the current project stays.
    fn switch_project(&mut self, manifest_path: &Path) -> Result<RenderSnapshot> {
        let manifest = Manifest::load(manifest_path)?;
        let catalog = self.load_catalog(&manifest)?;
        let project_dir = manifest.project_dir().to_path_buf();
        let project = ProjectInfo {
            key: project_dir.display().to_string(),
            name: manifest.display_name(),
        };

        debug!("Switching to `{}`", project_dir.display());
        self.config.manifest_path = manifest_path.to_path_buf();
        self.config.project_dir = project_dir;
        Ok(self.state.switch_project(catalog, project))
    }

    fn quit_code(&self) -> u8 {
        self.last_failure.unwrap_or(EXIT_SUCCESS)
    }

    /// Runs the picker until the user quits or a batch finishes.
    ///
    /// Returns the process exit code: 0 after a successful run or a clean
    /// quit, the code of the last failed or interrupted run when the user
    /// quits after one, and the interrupt code on a SIGINT/SIGTERM received
    /// while no script runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal can't be driven.
    pub fn run(mut self) -> Result<u8> {
        let mut guard = TerminalGuard::enter()?;
        let mut out = stdout();

        let (width, height) = terminal::size()?;
        let mut viewport = ViewportState::new(width, height);
        let mut snapshot = self.state.resize(width, height);
        let mut needs_redraw = true;

        loop {
            if self.signals.should_quit() {
                debug!("Signal received, leaving the picker");
                return Ok(EXIT_INTERRUPTED);
            }

            if needs_redraw {
                ui::draw(&mut out, &snapshot, &self.palette, &mut viewport)?;
                out.flush()?;
                needs_redraw = false;
            }

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            let Some(input) = decode_event(event::read()?) else {
                continue;
            };
            needs_redraw = true;

            let update = match input {
                InputEvent::Resize(width, height) => {
                    viewport.width = width;
                    viewport.height = height;
                    snapshot = self.state.resize(width, height);
                    continue;
                }
                InputEvent::Key(key) => self.state.handle_key(key),
            };
            snapshot = update.snapshot;

            match update.action {
                None => {}
                Some(Action::Quit) => return Ok(self.quit_code()),
                Some(Action::Refresh) => {
                    let reloaded = self.reload_catalog();
                    snapshot = self.state.replace_catalog(reloaded);
                }
                Some(Action::SwitchProject(manifest_path)) => {
                    snapshot = match self.switch_project(&manifest_path) {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            warn!("{e}");
                            self.state.report_failure(&e)
                        }
                    };
                }
                Some(Action::Run(requests)) => {
                    guard.suspend()?;
                    if self.config.dry_run {
                        print_dry_run(&mut out, &requests)?;
                        return Ok(EXIT_SUCCESS);
                    }

                    let result = run_requests(
                        &requests,
                        &mut self.state,
                        &self.config.project_dir,
                        self.signals,
                    );
                    let (error, exit_code) = match after_batch(result) {
                        AfterBatch::Exit(code) => return Ok(code),
                        AfterBatch::Resume { error, exit_code } => (error, exit_code),
                    };

                    guard.resume()?;
                    self.last_failure = Some(exit_code);
                    snapshot = self.after_failure(error, &mut viewport)?;
                }
            }
        }
    }

    fn after_failure(
        &mut self,
        error: Option<Error>,
        viewport: &mut ViewportState,
    ) -> Result<RenderSnapshot> {
        let (width, height) = terminal::size()?;
        *viewport = ViewportState::new(width, height);
        let mut snapshot = self.state.resize(width, height);
        if let Some(error) = error {
            warn!("{error}");
            snapshot = self.state.report_failure(&error);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_batch_exits() {
        assert!(matches!(
            after_batch(Ok(BatchOutcome::Completed)),
            AfterBatch::Exit(EXIT_SUCCESS)
        ));
    }

    #[test]
    fn test_interrupted_batch_returns_to_picker() {
        match after_batch(Ok(BatchOutcome::Interrupted)) {
            AfterBatch::Resume { error, exit_code } => {
                assert!(matches!(error, Some(Error::Interrupted)));
                assert_eq!(exit_code, EXIT_INTERRUPTED);
            }
            other => panic!("expected to resume, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_batch_returns_to_picker() {
        let failed = BatchOutcome::Failed {
            script: "lint".to_string(),
            exit_code: 2,
        };
        match after_batch(Ok(failed)) {
            AfterBatch::Resume { error, exit_code } => {
                assert!(matches!(error, Some(Error::ExecutionFailed { exit_code: 2, .. })));
                assert_eq!(exit_code, EXIT_SCRIPT_FAILED);
            }
            other => panic!("expected to resume, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_error_returns_to_picker() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let result = Err(Error::io_error("shell", "/no/such/shell", missing));
        assert!(matches!(
            after_batch(result),
            AfterBatch::Resume {
                exit_code: EXIT_SCRIPT_FAILED,
                ..
            }
        ));
    }
}
