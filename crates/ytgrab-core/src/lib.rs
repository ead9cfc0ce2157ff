//! ytgrab-core — format probing, parsing and download plumbing for the
//! `ytgrab` terminal UI.
//!
//! Everything in here is UI-free: the TUI crate consumes these modules
//! through the [`runner::Runner`] and the pure [`parser`]/[`rank`] functions.

pub mod config;
pub mod format;
pub mod parser;
pub mod platform;
pub mod rank;
pub mod runner;
