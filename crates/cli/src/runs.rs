//! Sequential execution of run requests.

use std::io::Write;
use std::path::Path;

use log::{debug, warn};
use nrs_core::app_state::{AppState, RunRequest};
use nrs_core::error::{Error, Result, EXIT_INTERRUPTED, EXIT_SCRIPT_FAILED, EXIT_SUCCESS};
use nrs_core::execution::{self, RunOutcome};

use crate::signals::SignalFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Failed { script: String, exit_code: i32 },
    Interrupted,
}

impl BatchOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            BatchOutcome::Completed => EXIT_SUCCESS,
            BatchOutcome::Failed { .. } => EXIT_SCRIPT_FAILED,
            BatchOutcome::Interrupted => EXIT_INTERRUPTED,
        }
    }

    pub fn as_error(&self) -> Option<Error> {
        match self {
            BatchOutcome::Completed => None,
            BatchOutcome::Failed { script, exit_code } => Some(Error::ExecutionFailed {
                script: script.clone(),
                exit_code: *exit_code,
            }),
            BatchOutcome::Interrupted => Some(Error::Interrupted),
        }
    }
}

/// Prints what would run, one command per line.
pub fn print_dry_run(out: &mut impl Write, requests: &[RunRequest]) -> std::io::Result<()> {
    writeln!(out, "Dry run is specified, not executing:")?;
    for request in requests {
        writeln!(out, "  {}", request.command_line)?;
    }
    Ok(())
}

/// Runs `requests` in order in `project_dir`, stopping at the first one that
/// doesn't succeed. Each completed run is recorded and history is persisted
/// after it, whatever the outcome.
///
/// # Errors
///
/// Returns an error if a shell can't be started.
pub fn run_requests(
    requests: &[RunRequest],
    state: &mut AppState,
    project_dir: &Path,
    signals: &SignalFlags,
) -> Result<BatchOutcome> {
    let total = requests.len();
    for (i, request) in requests.iter().enumerate() {
        if total > 1 {
            println!("Running {}/{}: {}...", i + 1, total, request.script);
        } else {
            println!("> {}", request.command_line);
        }

        let outcome =
            execution::run_request(request, project_dir, Some(signals.terminate_flag()))?;
        // A Ctrl+C typed at the child also reaches us.
        signals.clear_interrupt();
        if signals.take_terminate() {
            debug!("SIGTERM was forwarded to `{}`", request.script);
        }

        state.record_execution(request);
        if let Err(e) = state.persist_history() {
            warn!("Could not save history: {e}");
        }

        match outcome {
            RunOutcome::Success => {}
            RunOutcome::Failed(exit_code) => {
                return Ok(BatchOutcome::Failed {
                    script: request.script.clone(),
                    exit_code,
                })
            }
            RunOutcome::Interrupted => return Ok(BatchOutcome::Interrupted),
        }
    }

    Ok(BatchOutcome::Completed)
}
