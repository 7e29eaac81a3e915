use std::io::{stdout, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use nrs_core::app_state::{AppSettings, AppState, ProjectInfo, RunRequest};
use nrs_core::catalog::Catalog;
use nrs_core::config::{self, Config};
use nrs_core::error::{Result, EXIT_SUCCESS};
use nrs_core::history::HistoryStore;
use nrs_core::manifest::{self, Manifest};
use nrs_core::runner;
use nrs_core::workspace;

use nrs_cli::cli_args::{Args, RunMode};
use nrs_cli::listing::print_catalog;
use nrs_cli::runs::{print_dry_run, run_requests};
use nrs_cli::script_selection::{Session, SessionConfig};
use nrs_cli::signals::SignalFlags;

fn load_history(config: &Config) -> HistoryStore {
    let path = config.history.resolved_path();
    debug!("History path: `{}`", path.display());
    if config.history.enabled {
        HistoryStore::load(&path)
    } else {
        info!("History is disabled");
        HistoryStore::new(path)
    }
}

/// Runs one request outside the picker: `--last` and `--script`.
fn run_direct(
    request: RunRequest,
    args: &Args,
    state: &mut AppState,
    project_dir: &Path,
    signals: &SignalFlags,
) -> Result<u8> {
    if args.dry_run {
        print_dry_run(&mut stdout(), &[request])?;
        return Ok(EXIT_SUCCESS);
    }

    let outcome = run_requests(&[request], state, project_dir, signals)?;
    if let Some(e) = outcome.as_error() {
        eprintln!("Error: {e}");
    }
    Ok(outcome.exit_code())
}

fn execute(args: &Args) -> Result<u8> {
    let manifest_path = manifest::find_manifest(&args.path)?;
    let manifest = Manifest::load(&manifest_path)?;
    let project_dir = manifest.project_dir().to_path_buf();
    debug!("Project directory: `{}`", project_dir.display());

    let config = config::load_config(&project_dir, args.config.as_deref(), args.no_config)?;

    let exclude: Vec<String> = config
        .exclude
        .patterns
        .iter()
        .chain(args.exclude.iter())
        .cloned()
        .collect();
    let catalog = Catalog::build(&manifest)?.without_matching(&exclude)?;
    debug!("{} scripts after exclusions", catalog.len());

    let (runner, reason) = runner::detect_with_reason(
        &project_dir,
        Some(&manifest),
        args.runner.map(Into::into),
        config.general.runner,
    );
    debug!("Runner: {runner} ({reason})");

    let mode = args.run_mode();
    if mode == RunMode::List {
        let mut out = stdout();
        let styled = out.is_terminal();
        print_catalog(&mut out, &catalog, runner, styled)?;
        return Ok(EXIT_SUCCESS);
    }

    let mut settings = AppSettings::from_config(&config, runner);
    if let Some(sort) = args.sort {
        settings.sort_mode = sort.into();
    }
    settings.default_args.clone_from(&args.args);

    let project = ProjectInfo {
        key: project_dir.display().to_string(),
        name: manifest.display_name(),
    };
    let mut state = AppState::new(Rc::new(catalog), load_history(&config), project, settings);
    let signals = SignalFlags::register()?;

    match mode {
        RunMode::Last => {
            let mut request = state.rerun_last()?;
            if let Some(extra) = args.args.as_deref() {
                request = state.request_named(&request.script, Some(extra))?;
            }
            run_direct(request, args, &mut state, &project_dir, &signals)
        }
        RunMode::Script(name) => {
            let resolved = config.resolve_alias(&name);
            if resolved != name {
                debug!("Alias `{name}` resolves to `{resolved}`");
            }
            let request = state.request_named(resolved, args.args.as_deref())?;
            run_direct(request, args, &mut state, &project_dir, &signals)
        }
        RunMode::Interactive | RunMode::List => {
            let workspace = workspace::discover(&manifest).unwrap_or_else(|e| {
                warn!("{e}; workspace switching is off");
                None
            });
            let state = state.with_workspace(workspace);
            let session_config = SessionConfig {
                manifest_path,
                project_dir,
                exclude,
                theme: config.appearance.theme,
                dry_run: args.dry_run,
            };
            Session::new(state, session_config, &signals).run()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Some(shell) = args.completions {
        Args::write_completions(shell, &mut stdout());
        return ExitCode::SUCCESS;
    }
    env_logger::Builder::from_env(Env::default().default_filter_or(args.default_log_filter()))
        .init();

    match execute(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
