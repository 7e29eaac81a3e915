//! Interactive script picker.
//!
//! Scripts are laid out in a grid sized to the terminal width. Typing filters
//! the grid, `1`-`9` run a script directly, `m` picks several to run in
//! order and `?` lists every binding.
//!
//! The state machine lives in [`nrs_core::app_state`]; this module only turns
//! terminal events into keys and snapshots into frames.

pub mod colors;
pub mod input;
pub mod session;
pub mod types;
pub mod ui;

pub use session::{Session, SessionConfig, TerminalGuard};
