use std::rc::Rc;

use clap::Parser;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use nrs_cli::cli_args::{Args, RunMode};
use nrs_cli::script_selection::colors::Palette;
use nrs_cli::script_selection::input::decode_event;
use nrs_cli::script_selection::types::{InputEvent, ViewportState};
use nrs_cli::script_selection::ui;
use nrs_core::app_state::{Action, AppSettings, AppState, ProjectInfo, SortMode};
use nrs_core::catalog::{Catalog, ScriptEntry};
use nrs_core::history::HistoryStore;
use nrs_core::runner::RunnerKind;
use tempfile::TempDir;

const PROJECT: &str = "/work/web";

fn settings() -> AppSettings {
    AppSettings {
        runner: RunnerKind::Npm,
        sort_mode: SortMode::Alpha,
        include_lifecycle: false,
        search_descriptions: true,
        history_enabled: true,
        default_args: None,
    }
}

fn state(names: &[&str], history_dir: &TempDir) -> AppState {
    let catalog = Catalog::from_entries(
        names
            .iter()
            .map(|n| ScriptEntry::new(n, &format!("echo {n}")))
            .collect(),
    )
    .unwrap();
    AppState::new(
        Rc::new(catalog),
        HistoryStore::new(history_dir.path().join("history.json")),
        ProjectInfo {
            key: PROJECT.to_string(),
            name: "web".to_string(),
        },
        settings(),
    )
}

fn key_event(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Feeds crossterm events through the decoder into the state machine and
/// returns the last action produced.
fn feed(state: &mut AppState, events: Vec<Event>) -> Option<Action> {
    let mut action = None;
    for event in events {
        match decode_event(event) {
            Some(InputEvent::Key(key)) => action = state.handle_key(key).action,
            Some(InputEvent::Resize(width, height)) => {
                state.resize(width, height);
            }
            None => {}
        }
    }
    action
}

#[test]
fn test_filter_and_run_from_key_events() {
    let dir = TempDir::new().unwrap();
    let mut state = state(&["build", "bundle", "test"], &dir);

    let action = feed(
        &mut state,
        vec![
            Event::Resize(100, 30),
            key_event(KeyCode::Char('/')),
            key_event(KeyCode::Char('b')),
            key_event(KeyCode::Char('d')),
            key_event(KeyCode::Enter),
        ],
    );

    match action {
        Some(Action::Run(requests)) => {
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].script, "build");
            assert_eq!(requests[0].command_line, "npm run build");
        }
        other => panic!("expected a run action, got {other:?}"),
    }
}

#[test]
fn test_ctrl_c_quits_from_filter() {
    let dir = TempDir::new().unwrap();
    let mut state = state(&["dev"], &dir);

    let action = feed(
        &mut state,
        vec![
            key_event(KeyCode::Char('/')),
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        ],
    );
    assert_eq!(action, Some(Action::Quit));
}

#[test]
fn test_draw_state_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut state = state(&["dev", "build", "lint"], &dir);
    let snapshot = state.resize(100, 20);

    let mut out = Vec::new();
    let mut viewport = ViewportState::new(100, 20);
    ui::draw(&mut out, &snapshot, &Palette::default(), &mut viewport).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("web (npm) | 3 scripts | sort: alpha"));
    assert!(text.contains("[1] build"));
    assert!(text.contains("[3] lint"));
}

#[test]
fn test_args_entry_from_key_events() {
    let dir = TempDir::new().unwrap();
    let mut state = state(&["build", "test"], &dir);

    let mut events = vec![
        key_event(KeyCode::Right),
        Event::Key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
    ];
    events.extend("--ci".chars().map(|c| key_event(KeyCode::Char(c))));
    events.push(key_event(KeyCode::Enter));

    match feed(&mut state, events) {
        Some(Action::Run(requests)) => {
            assert_eq!(requests[0].script, "test");
            assert_eq!(requests[0].command_line, "npm run test -- --ci");
        }
        other => panic!("expected a run action, got {other:?}"),
    }
}

#[test]
fn test_completions_skip_everything_else() {
    let args = Args::parse_from(["nrs", "--completions", "fish", "/no/such/dir"]);
    let shell = args.completions.unwrap();

    let mut out = Vec::new();
    Args::write_completions(shell, &mut out);
    assert!(String::from_utf8(out).unwrap().contains("complete -c nrs"));
}

#[test]
fn test_args_for_rerun_with_override() {
    let args = Args::parse_from(["nrs", "-L", "-a", "--ci", "packages/web"]);
    assert_eq!(args.run_mode(), RunMode::Last);
    assert_eq!(args.args.as_deref(), Some("--ci"));
    assert_eq!(args.path.to_str(), Some("packages/web"));
}

#[cfg(unix)]
mod execution {
    use super::*;
    use nrs_cli::runs::{run_requests, BatchOutcome};
    use nrs_cli::signals::SignalFlags;
    use nrs_core::app_state::RunRequest;

    fn raw(script: &str, command_line: &str) -> RunRequest {
        RunRequest {
            script: script.to_string(),
            args: None,
            command_line: command_line.to_string(),
        }
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let mut state = state(&["a", "b", "c"], &dir);
        let signals = SignalFlags::default();

        let requests = vec![raw("a", "true"), raw("b", "exit 3"), raw("c", "true")];
        let outcome = run_requests(&requests, &mut state, dir.path(), &signals).unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Failed {
                script: "b".to_string(),
                exit_code: 3
            }
        );
        assert!(state.history().script(PROJECT, "a").is_some());
        assert!(state.history().script(PROJECT, "b").is_some());
        assert!(state.history().script(PROJECT, "c").is_none());
        assert!(dir.path().join("history.json").is_file());
    }

    #[test]
    fn test_batch_runs_in_project_dir() {
        let dir = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let mut state = state(&["touch"], &dir);
        let signals = SignalFlags::default();

        let requests = vec![raw("touch", "touch ran.txt")];
        let outcome = run_requests(&requests, &mut state, project.path(), &signals).unwrap();

        assert_eq!(outcome, BatchOutcome::Completed);
        assert!(project.path().join("ran.txt").is_file());
    }
}
