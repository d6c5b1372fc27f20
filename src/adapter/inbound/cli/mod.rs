//! CLI module graph.

pub mod check;
pub mod command;
pub mod output;
pub mod watch;
