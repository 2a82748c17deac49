//! Aulactl library - exposes modules for testing

pub mod cli;
pub mod commands;
pub mod output;
pub mod play;
pub mod portal;

pub use cli::{AdminCommands, Cli, Commands, Visibility};
pub use portal::Portal;
