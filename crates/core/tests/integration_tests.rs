//! Integration tests for nrs-core
//!
//! These tests verify that the core functionality works together correctly
//! by testing complete workflows end-to-end against real files.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use nrs_core::app_state::{Action, AppSettings, AppState, Key, ProjectInfo, SortMode};
use nrs_core::catalog::Catalog;
use nrs_core::config::load_config_from;
use nrs_core::error::{Error, ParseError};
use nrs_core::history::{HistoryStore, MAX_SCRIPTS_PER_PROJECT};
use nrs_core::manifest::{find_manifest, Manifest};
use nrs_core::runner::{detect, RunnerKind};
use nrs_core::workspace;
use tempfile::tempdir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 30, 0).unwrap()
}

fn write_manifest(dir: &Path, content: &str) {
    fs::write(dir.join("package.json"), content).unwrap();
}

fn app_for(dir: &Path, history: HistoryStore) -> AppState {
    let path = find_manifest(dir).unwrap();
    let manifest = Manifest::load(&path).unwrap();
    let catalog = Catalog::build(&manifest).unwrap();
    let runner = detect(manifest.project_dir(), Some(&manifest), None, None);
    let settings = AppSettings {
        runner,
        sort_mode: SortMode::Recent,
        include_lifecycle: false,
        search_descriptions: true,
        history_enabled: true,
        default_args: None,
    };
    AppState::new(
        Rc::new(catalog),
        history,
        ProjectInfo {
            key: manifest.project_dir().display().to_string(),
            name: manifest.display_name(),
        },
        settings,
    )
    .with_clock(now)
}

/// Test discovering a manifest from a nested directory and building its catalog
#[test]
fn test_discover_and_build_catalog() {
    let dir = tempdir().unwrap();
    write_manifest(
        dir.path(),
        r#"{"name": "shop", "scripts": {"dev": "vite", "build": "vite build", "postinstall": "husky"},
            "scripts-info": {"dev": "Start dev server"}}"#,
    );
    fs::write(dir.path().join("yarn.lock"), "").unwrap();
    let nested = dir.path().join("src").join("pages");
    fs::create_dir_all(&nested).unwrap();

    let state = app_for(&nested, HistoryStore::new(dir.path().join("history.json")));
    let snapshot = state.snapshot();

    assert_eq!(state.runner(), RunnerKind::Yarn);
    assert_eq!(state.catalog().len(), 3);
    let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["dev", "build"]);
    assert_eq!(
        snapshot.entries[0].description.as_deref(),
        Some("Start dev server")
    );
    assert!(snapshot.header.starts_with("shop (yarn)"));
}

/// Test that runs are recorded, persisted, and reorder the next session
#[test]
fn test_history_round_trip_changes_recent_order() {
    let dir = tempdir().unwrap();
    write_manifest(
        dir.path(),
        r#"{"scripts": {"dev": "vite", "test": "vitest", "lint": "eslint ."}}"#,
    );
    let history_path = dir.path().join("state").join("history.json");

    let mut state = app_for(dir.path(), HistoryStore::load(&history_path));
    let update = state.handle_key(Key::Char('3'));
    let Some(Action::Run(requests)) = update.action else {
        panic!("expected a run action");
    };
    assert_eq!(requests[0].command_line, "npm run lint");
    state.record_execution(&requests[0]);
    state.persist_history().unwrap();

    let reloaded = app_for(dir.path(), HistoryStore::load(&history_path));
    let first = reloaded.snapshot().entries[0].name.clone();
    assert_eq!(first, "lint");

    let request = reloaded.rerun_last().unwrap();
    assert_eq!(request.script, "lint");
}

/// Test that rerun-last without history reports the "no previous script" error
#[test]
fn test_last_without_history() {
    let dir = tempdir().unwrap();
    write_manifest(dir.path(), r#"{"scripts": {"dev": "vite"}}"#);

    let state = app_for(dir.path(), HistoryStore::load(&dir.path().join("h.json")));
    let err = state.rerun_last().unwrap_err();

    assert!(matches!(err, Error::NoHistory));
    assert_eq!(err.exit_code(), 1);
}

/// Test the exit codes for manifest problems
#[test]
fn test_manifest_error_exit_codes() {
    let empty = tempdir().unwrap();
    write_manifest(empty.path(), r#"{"name": "nothing"}"#);
    let manifest = Manifest::load(&empty.path().join("package.json")).unwrap();
    let err: Error = Catalog::build(&manifest).unwrap_err().into();
    assert_eq!(err.exit_code(), 3);

    let broken = tempdir().unwrap();
    write_manifest(broken.path(), "{ nope");
    let err = Manifest::load(&broken.path().join("package.json")).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let malformed = tempdir().unwrap();
    write_manifest(malformed.path(), r#"{"scripts": "dev"}"#);
    let manifest = Manifest::load(&malformed.path().join("package.json")).unwrap();
    assert!(matches!(
        Catalog::build(&manifest),
        Err(ParseError::Malformed(_))
    ));
}

/// Test that a corrupt history file degrades to empty and is kept as a backup
#[test]
fn test_corrupt_history_is_recovered() {
    let dir = tempdir().unwrap();
    write_manifest(dir.path(), r#"{"scripts": {"dev": "vite"}}"#);
    let history_path = dir.path().join("history.json");
    fs::write(&history_path, "[[[").unwrap();

    let mut state = app_for(dir.path(), HistoryStore::load(&history_path));
    assert!(state.history().is_empty());

    let update = state.handle_key(Key::Enter);
    let Some(Action::Run(requests)) = update.action else {
        panic!("expected a run action");
    };
    state.record_execution(&requests[0]);
    state.persist_history().unwrap();

    assert!(history_path.with_extension("json.bak").exists());
    let reloaded = HistoryStore::try_load(&history_path).unwrap();
    assert_eq!(reloaded.script_count(&dir.path().canonicalize().unwrap().display().to_string()), 1);
}

/// Test that the per-project script limit holds across persistence
#[test]
fn test_script_limit_survives_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    let mut history = HistoryStore::new(path.clone());

    for i in 0..=MAX_SCRIPTS_PER_PROJECT {
        history.record("/proj", &format!("s{i:02}"), None, now() + Duration::minutes(i as i64));
    }
    history.persist().unwrap();

    let reloaded = HistoryStore::try_load(&path).unwrap();
    assert_eq!(reloaded.script_count("/proj"), MAX_SCRIPTS_PER_PROJECT);
    assert!(reloaded.script("/proj", "s00").is_none());
}

/// Test configuration layering feeding the application settings
#[test]
fn test_config_drives_settings() {
    let dir = tempdir().unwrap();
    write_manifest(
        dir.path(),
        r#"{"scripts": {"b": "1", "a": "2", "test:unit": "3"}}"#,
    );
    fs::write(
        dir.path().join(".nrsrc.toml"),
        "[general]\nrunner = \"bun\"\ndefault_sort = \"alpha\"\n[exclude]\npatterns = [\"test:*\"]\n",
    )
    .unwrap();

    let config = load_config_from(None, dir.path(), None).unwrap();
    let manifest = Manifest::load(&dir.path().join("package.json")).unwrap();
    let catalog = Catalog::build(&manifest)
        .unwrap()
        .without_matching(&config.exclude.patterns)
        .unwrap();
    let runner = detect(dir.path(), Some(&manifest), None, config.general.runner);

    let state = AppState::new(
        Rc::new(catalog),
        HistoryStore::new(dir.path().join("h.json")),
        ProjectInfo {
            key: dir.path().display().to_string(),
            name: "demo".to_string(),
        },
        AppSettings::from_config(&config, runner),
    );

    let snapshot = state.snapshot();
    let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(snapshot.runner, RunnerKind::Bun);
    assert_eq!(snapshot.sort_mode, SortMode::Alpha);
}

/// Test switching from a monorepo root into a member and running its script
#[test]
fn test_monorepo_member_switch() {
    let dir = tempdir().unwrap();
    write_manifest(
        dir.path(),
        r#"{"name": "acme", "workspaces": ["packages/*"], "scripts": {"build": "turbo build"}}"#,
    );
    fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
    fs::create_dir_all(dir.path().join("packages/api")).unwrap();
    write_manifest(
        &dir.path().join("packages/api"),
        r#"{"name": "@acme/api", "scripts": {"start": "node server.js"}}"#,
    );

    let root = Manifest::load(&find_manifest(dir.path()).unwrap()).unwrap();
    let found = workspace::discover(&root).unwrap();
    let mut app = app_for(dir.path(), HistoryStore::new(dir.path().join("h.json")))
        .with_workspace(found);

    app.handle_key(Key::Char('w'));
    app.handle_key(Key::Char('j'));
    let manifest_path = match app.handle_key(Key::Enter).action {
        Some(Action::SwitchProject(path)) => path,
        other => panic!("expected a project switch, got {other:?}"),
    };

    let member = Manifest::load(&manifest_path).unwrap();
    app.switch_project(
        Catalog::build(&member).unwrap(),
        ProjectInfo {
            key: member.project_dir().display().to_string(),
            name: member.display_name(),
        },
    );
    match app.handle_key(Key::Enter).action {
        Some(Action::Run(requests)) => {
            assert_eq!(requests[0].script, "start");
            assert_eq!(requests[0].command_line, "pnpm start");
        }
        other => panic!("expected a run action, got {other:?}"),
    }
    assert!(app.snapshot().header.starts_with("@acme/api (pnpm)"));
}
