//! Command-line interface module.
//!
//! Provides argument parsing and the one-shot commands.

pub mod args;
pub mod commands;
