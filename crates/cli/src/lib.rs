//! Command-line front end for nrs.
//!
//! The engine lives in `nrs-core`. This crate parses arguments, drives the
//! terminal and runs scripts in the foreground.
//!
//! - [`cli_args`]: the clap argument surface
//! - [`script_selection`]: the interactive picker
//! - [`runs`]: sequential execution and dry runs
//! - [`listing`]: `--list` output
//! - [`signals`]: SIGINT/SIGTERM capture
//!
//! ```bash
//! # Pick a script from the nearest package.json
//! nrs
//!
//! # Run a script directly, with extra arguments
//! nrs -n test -a "--watch"
//!
//! # Rerun whatever ran last here
//! nrs --last
//!
//! # Show what would run
//! nrs --dry-run -n build
//! ```

pub mod cli_args;
pub mod listing;
pub mod runs;
pub mod script_selection;
pub mod signals;
