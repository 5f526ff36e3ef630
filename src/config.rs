//! Settings file handling.
//!
//! Settings are read from `--config`, else from `config.toml` in the user
//! config directory, else built-in defaults apply. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::backend::BackendKind;
use crate::constants;
use crate::error::{Result, SwitchError};
use crate::restart::{CommandRunner, Restarter};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Address of the HTTP control surface.
    pub listen: String,
    /// Forced backend; autodetected when unset.
    pub backend: Option<BackendKind>,
    pub wireguard: WireGuardSettings,
    pub openvpn: OpenVpnSettings,
    pub mullvad: MullvadSettings,
    pub restart: RestartSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WireGuardSettings {
    /// Also used by the Mullvad backend.
    pub config_path: PathBuf,
    pub interface: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenVpnSettings {
    /// Must hold exactly one `*.conf` file.
    pub config_dir: PathBuf,
    pub interface: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MullvadSettings {
    pub relays_v1_url: String,
    pub relays_v2_url: String,
    pub refresh_interval_secs: u64,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestartSettings {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: constants::DEFAULT_LISTEN.to_string(),
            backend: None,
            wireguard: WireGuardSettings::default(),
            openvpn: OpenVpnSettings::default(),
            mullvad: MullvadSettings::default(),
            restart: RestartSettings::default(),
        }
    }
}

impl Default for WireGuardSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(constants::WIREGUARD_CONFIG_PATH),
            interface: constants::WIREGUARD_INTERFACE.to_string(),
        }
    }
}

impl Default for OpenVpnSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(constants::OPENVPN_CONFIG_DIR),
            interface: constants::OPENVPN_INTERFACE.to_string(),
            service: constants::OPENVPN_SERVICE.to_string(),
        }
    }
}

impl Default for MullvadSettings {
    fn default() -> Self {
        Self {
            relays_v1_url: constants::MULLVAD_RELAYS_V1_URL.to_string(),
            relays_v2_url: constants::MULLVAD_RELAYS_V2_URL.to_string(),
            refresh_interval_secs: constants::RELAY_REFRESH_INTERVAL.as_secs(),
            http_timeout_secs: constants::HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: u64::try_from(constants::TEARDOWN_POLL_INTERVAL.as_millis())
                .unwrap_or(1000),
            max_polls: constants::TEARDOWN_MAX_POLLS,
        }
    }
}

impl MullvadSettings {
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl RestartSettings {
    /// Restart sequencer using these timings.
    #[must_use]
    pub fn restarter(&self, runner: Arc<dyn CommandRunner>) -> Restarter {
        Restarter::new(
            runner,
            Duration::from_millis(self.poll_interval_ms),
            self.max_polls,
        )
    }
}

impl Settings {
    /// Loads settings from `explicit`, or from the default location if it
    /// exists, or falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Io`] if an explicit file cannot be read and
    /// [`SwitchError::Config`] if a file does not parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses a settings file.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SwitchError::io(path, e))?;
        Self::parse(&content).map_err(|e| match e {
            SwitchError::Config(message) => {
                SwitchError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// # Errors
    ///
    /// Returns [`SwitchError::Config`] on invalid TOML, unknown keys or
    /// out-of-range values.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| SwitchError::Config(e.message().to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.mullvad.refresh_interval_secs == 0 {
            return Err(SwitchError::Config(
                "mullvad.refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.mullvad.http_timeout_secs == 0 {
            return Err(SwitchError::Config(
                "mullvad.http_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `config.toml` in the user config directory.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join(constants::APP_NAME)
            .join(constants::SETTINGS_FILE_NAME)
    })
}
