//! Switchable VPN backends.
//!
//! Every backend exposes the [`Switchable`] capability. Optional
//! capabilities (cycling to the next server, a custom index page) are
//! carried by the [`Backend`] tagged union instead of being probed at
//! runtime.

pub mod mullvad;
pub mod openvpn;
pub mod resolver;
pub mod toggle;
pub mod wireguard;

use std::fmt;

use serde::Deserialize;

use crate::error::{Result, SwitchError};

pub use mullvad::{IndexView, MullvadBackend};
pub use toggle::ToggleSwitch;

/// A VPN whose exit server can be switched.
pub trait Switchable: Send + Sync {
    /// The current server, empty when none is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read.
    fn current(&self) -> Result<String>;

    /// Available servers.
    ///
    /// # Errors
    ///
    /// Returns an error if the servers cannot be enumerated.
    fn list(&self) -> Result<Vec<String>>;

    /// Switches to `server` and restarts the tunnel. Switching to the
    /// current server does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::NotFound`] for an unknown server, or the
    /// error of the config write or tunnel restart.
    fn switch(&self, server: &str) -> Result<()>;
}

/// Supported VPN backends, in autodetection order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Mullvad `WireGuard` with relays from the Mullvad API.
    Mullvad,
    /// `OpenVPN` with commented-out `remote` lines.
    #[value(name = "openvpn")]
    OpenVpn,
    /// `WireGuard` with commented-out `Endpoint` lines.
    #[value(name = "wireguard")]
    WireGuard,
}

impl BackendKind {
    pub const ALL: [Self; 3] = [Self::Mullvad, Self::OpenVpn, Self::WireGuard];
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mullvad => write!(f, "Mullvad"),
            Self::OpenVpn => write!(f, "OpenVPN"),
            Self::WireGuard => write!(f, "WireGuard"),
        }
    }
}

/// The backend selected at boot.
pub enum Backend {
    Mullvad(MullvadBackend),
    OpenVpn(ToggleSwitch),
    WireGuard(ToggleSwitch),
}

impl Backend {
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Mullvad(_) => BackendKind::Mullvad,
            Self::OpenVpn(_) => BackendKind::OpenVpn,
            Self::WireGuard(_) => BackendKind::WireGuard,
        }
    }

    fn switchable(&self) -> &dyn Switchable {
        match self {
            Self::Mullvad(backend) => backend,
            Self::OpenVpn(backend) | Self::WireGuard(backend) => backend,
        }
    }

    /// Switches to the server following the current one in the list,
    /// wrapping around.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Unsupported`] for Mullvad and
    /// [`SwitchError::Inconsistent`] if the current server is not listed.
    pub fn next(&self) -> Result<()> {
        match self {
            Self::Mullvad(_) => Err(SwitchError::Unsupported("next")),
            Self::OpenVpn(backend) | Self::WireGuard(backend) => backend.next(),
        }
    }

    /// Data for a backend-specific index page, if the backend has one.
    #[must_use]
    pub fn index_view(&self) -> Option<Result<IndexView>> {
        match self {
            Self::Mullvad(backend) => Some(backend.index_view()),
            Self::OpenVpn(_) | Self::WireGuard(_) => None,
        }
    }
}

impl Switchable for Backend {
    fn current(&self) -> Result<String> {
        self.switchable().current()
    }

    fn list(&self) -> Result<Vec<String>> {
        self.switchable().list()
    }

    fn switch(&self, server: &str) -> Result<()> {
        self.switchable().switch(server)
    }
}

/// The element following `current` in `list`, wrapping around.
///
/// # Errors
///
/// Returns [`SwitchError::Inconsistent`] if `current` is not in `list`.
pub fn next_in(list: &[String], current: &str) -> Result<String> {
    list.iter()
        .position(|server| server == current)
        .map(|i| list[(i + 1) % list.len()].clone())
        .ok_or_else(|| {
            SwitchError::Inconsistent(format!(
                "could not find next server: current {current:?} is not listed"
            ))
        })
}
