//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::backend::BackendKind;
use crate::config::Settings;

/// exitswitch - switch the exit server of a VPN tunnel over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Address of the HTTP control surface
    #[arg(long, env = "EXITSWITCH_LISTEN", global = true)]
    pub listen: Option<String>,

    /// Skip autodetection and use this backend
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    /// Settings file (defaults to config.toml in the user config directory)
    #[arg(long, env = "EXITSWITCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve the HTTP control surface
    Serve,
    /// Print the current server
    Current,
    /// Print the available servers, one per line
    List,
    /// Switch to a server and restart the tunnel
    Switch {
        /// Server endpoint, as printed by `list`
        server: String,
    },
    /// Switch to the server following the current one
    Next,
}

impl Args {
    /// The subcommand to run.
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// Applies command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(listen) = &self.listen {
            settings.listen.clone_from(listen);
        }
        if let Some(backend) = self.backend {
            settings.backend = Some(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let args = Args::try_parse_from(["exitswitch"]).unwrap();
        assert_eq!(args.command(), Commands::Serve);
        assert!(args.backend.is_none());
    }

    #[test]
    fn test_switch_with_overrides() {
        let args = Args::try_parse_from([
            "exitswitch",
            "switch",
            "1.2.3.4:51820",
            "--backend",
            "wireguard",
            "--listen",
            "127.0.0.1:8081",
        ])
        .unwrap();
        assert_eq!(
            args.command(),
            Commands::Switch {
                server: "1.2.3.4:51820".to_string()
            }
        );

        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.backend, Some(BackendKind::WireGuard));
        assert_eq!(settings.listen, "127.0.0.1:8081");
    }

    #[test]
    fn test_apply_keeps_settings_without_flags() {
        let args = Args::try_parse_from(["exitswitch", "list"]).unwrap();
        let mut settings = Settings::default();
        settings.backend = Some(BackendKind::OpenVpn);
        args.apply(&mut settings);
        assert_eq!(settings.backend, Some(BackendKind::OpenVpn));
        assert_eq!(settings.listen, Settings::default().listen);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Args::try_parse_from(["exitswitch", "--backend", "ipsec"]).is_err());
    }
}
