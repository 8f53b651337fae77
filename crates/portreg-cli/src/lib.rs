//! Portreg CLI - command-line interface for the port registry
//!
//! This crate provides the `portreg` binary: one-shot commands against a
//! backend and an interactive shell.

pub mod config;
pub mod console;
pub mod render;
pub mod shell;

pub use config::{Command, Config, ListFormat, SortField};
