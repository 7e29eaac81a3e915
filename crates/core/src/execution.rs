use std::env;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app_state::RunRequest;
use crate::config::DEFAULT_SHELL;
use crate::error::{Error, Result, EXIT_INTERRUPTED};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(i32),
    Interrupted,
}

impl RunOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => RunOutcome::Success,
            Some(code) if code == i32::from(EXIT_INTERRUPTED) => RunOutcome::Interrupted,
            Some(code) => RunOutcome::Failed(code),
            // Killed by a signal.
            None => RunOutcome::Interrupted,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failed(code) => *code,
            RunOutcome::Interrupted => i32::from(EXIT_INTERRUPTED),
        }
    }
}

/// The user's shell from `$SHELL`, or [`DEFAULT_SHELL`].
pub fn get_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// A command that runs `command_line` through `shell -c` inside `directory`.
pub fn shell_command(shell: &str, command_line: &str, directory: &Path) -> Command {
    let mut command = Command::new(shell);
    command.args(["-c", command_line]).current_dir(directory);
    command
}

#[cfg(unix)]
fn forward_terminate(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(child.id()) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        warn!("Could not forward SIGTERM to child {raw}: {e}");
    }
}

#[cfg(not(unix))]
fn forward_terminate(child: &Child) {
    let _ = child;
}

fn wait_for_child(mut child: Child, terminate: Option<&AtomicBool>) -> std::io::Result<ExitStatus> {
    let mut forwarded = false;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if !forwarded && terminate.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!("Forwarding termination to child {}", child.id());
            forward_terminate(&child);
            forwarded = true;
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Runs a command in the foreground with inherited stdio.
///
/// If `terminate` becomes set while the child runs, SIGTERM is forwarded to
/// the child once and the call keeps waiting for it to exit.
///
/// # Errors
///
/// Returns an error if the child can't be spawned or waited on.
pub fn execute_command(mut command: Command, terminate: Option<&AtomicBool>) -> Result<RunOutcome> {
    let command = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let program = command.get_program().to_string_lossy().to_string();
    let child = command
        .spawn()
        .map_err(|e| Error::io_error("shell", &program, e))?;

    let status = wait_for_child(child, terminate)
        .map_err(|e| Error::io_error("shell", &program, e))?;

    Ok(RunOutcome::from_status(status))
}

/// Runs one request in `project_dir` through the user's shell.
///
/// # Errors
///
/// Returns an error if the shell can't be started.
pub fn run_request(
    request: &RunRequest,
    project_dir: &Path,
    terminate: Option<&AtomicBool>,
) -> Result<RunOutcome> {
    let shell = get_shell();
    info!("Running `{}` with {shell}", request.command_line);
    execute_command(
        shell_command(&shell, &request.command_line, project_dir),
        terminate,
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run(command_line: &str) -> RunOutcome {
        let dir = tempdir().unwrap();
        execute_command(shell_command("/bin/sh", command_line, dir.path()), None).unwrap()
    }

    #[test]
    fn test_success() {
        assert_eq!(run("true"), RunOutcome::Success);
    }

    #[test]
    fn test_failure_code() {
        let outcome = run("exit 3");
        assert_eq!(outcome, RunOutcome::Failed(3));
        assert_eq!(outcome.exit_code(), 3);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_exit_130_is_interrupted() {
        assert_eq!(run("exit 130"), RunOutcome::Interrupted);
    }

    #[test]
    fn test_killed_by_signal_is_interrupted() {
        assert_eq!(run("kill -TERM $$"), RunOutcome::Interrupted);
    }

    #[test]
    fn test_runs_in_directory() {
        let dir = tempdir().unwrap();
        let command = shell_command("/bin/sh", "touch marker", dir.path());
        assert_eq!(execute_command(command, None).unwrap(), RunOutcome::Success);
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_terminate_flag_is_forwarded() {
        let dir = tempdir().unwrap();
        let flag = AtomicBool::new(true);
        let command = shell_command("/bin/sh", "sleep 5", dir.path());

        let outcome = execute_command(command, Some(&flag)).unwrap();
        assert_eq!(outcome, RunOutcome::Interrupted);
    }

    #[test]
    fn test_missing_shell_is_error() {
        let dir = tempdir().unwrap();
        let command = shell_command("/no/such/shell", "true", dir.path());
        assert!(matches!(
            execute_command(command, None),
            Err(Error::Io { .. })
        ));
    }
}
