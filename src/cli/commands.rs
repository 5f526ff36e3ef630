//! One-shot commands run against the resolved backend.

use std::io::Write;

use log::info;

use super::args::Commands;
use crate::backend::{Backend, Switchable};
use crate::error::{Result, SwitchError};

/// Runs a one-shot command, writing its output to `out`.
///
/// `serve` is handled by the caller and does nothing here.
///
/// # Errors
///
/// Returns the backend error, or [`SwitchError::Io`] if
/// `out` cannot be written.
pub fn run(backend: &Backend, command: &Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Serve => Ok(()),
        Commands::Current => print(out, &backend.current()?),
        Commands::List => {
            let mut servers = backend.list()?;
            servers.sort();
            for server in &servers {
                print(&mut *out, server)?;
            }
            Ok(())
        }
        Commands::Switch { server } => {
            backend.switch(server)?;
            info!("switched {} to {server}", backend.kind());
            Ok(())
        }
        Commands::Next => {
            backend.next()?;
            info!("switched {} to {}", backend.kind(), backend.current()?);
            Ok(())
        }
    }
}

fn print(out: &mut impl Write, line: &str) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| SwitchError::io("stdout", e))
}
