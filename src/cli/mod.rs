//! CLI module for scenecast
//!
//! Contains argument parsing, command implementations and the terminal
//! time readout.

pub mod args;
pub mod commands;
pub mod completions;
pub mod display;

pub use args::{Cli, Commands, ConfigCommand, LibraryCommand, PermissionCommand};
