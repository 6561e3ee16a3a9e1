//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod helpers;
pub mod init;
pub mod list;
pub mod run;
pub mod show;
