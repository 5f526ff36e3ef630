//! Switch the exit server of a `WireGuard`, `OpenVPN` or Mullvad tunnel.
//!
//! The active server lives in the tunnel's own config file: alternatives
//! are kept as commented-out lines, or, for Mullvad, come from the relay
//! API. Switching rewrites the file and restarts the tunnel.

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod restart;
pub mod server;
pub mod utils;
