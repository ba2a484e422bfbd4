//! kanban-reorder CLI library
//!
//! The binary in `main.rs` is a thin dispatcher over these modules.

pub mod cli;
pub mod commands;
mod error;
pub mod replay;
pub mod table;

pub use cli::{CardTarget, Cli, Commands};
pub use error::{CliError, Result};
