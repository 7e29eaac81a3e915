//! nrs Core Library
//!
//! This crate provides the engine behind `nrs`, a terminal picker for the
//! scripts defined in a project's `package.json`. It knows nothing about the
//! terminal: the front end feeds it decoded keys and draws the snapshots it
//! returns.
//!
//! # Key Features
//!
//! - **Script Catalog**: Ordered script entries with descriptions from `scripts-info`, `ntl` or comment keys
//! - **Runner Detection**: npm, yarn, pnpm or bun from overrides, `packageManager` or lock files
//! - **Execution History**: Bounded per-project run statistics with a recency/frequency score
//! - **Filtering**: Tiered exact/prefix/substring/fuzzy matching with deterministic ordering
//! - **Workspaces**: Monorepo members from `pnpm-workspace.yaml`, `lerna.json` or `workspaces`
//! - **Application State**: The mode state machine that ties the pieces together
//!
//! # Examples
//!
//! Building the catalog for the project in the current directory:
//!
//! ```no_run
//! use nrs_core::catalog::Catalog;
//! use nrs_core::manifest::{find_manifest, Manifest};
//!
//! let path = find_manifest(std::path::Path::new("."))?;
//! let manifest = Manifest::load(&path)?;
//! let catalog = Catalog::build(&manifest)?;
//! for entry in catalog.entries() {
//!     println!("{entry}");
//! }
//! # Ok::<(), nrs_core::error::Error>(())
//! ```

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod filter;
pub mod history;
pub mod manifest;
pub mod runner;
pub mod workspace;
