//! Plain `WireGuard`: switch between `Endpoint` lines commented out with `#`.

use super::ToggleSwitch;
use crate::codec::Dialect;
use crate::config::WireGuardSettings;
use crate::error::{Result, SwitchError};
use crate::restart::{RestartPlan, Restarter};

/// Opens the `WireGuard` config.
///
/// # Errors
///
/// Returns [`SwitchError::NotConfigured`] if the config file is absent.
pub fn open(settings: &WireGuardSettings, restarter: Restarter) -> Result<ToggleSwitch> {
    if !settings.config_path.is_file() {
        return Err(SwitchError::NotConfigured(format!(
            "{} not found",
            settings.config_path.display()
        )));
    }
    Ok(ToggleSwitch::new(
        settings.config_path.clone(),
        Dialect::WIREGUARD_ENDPOINT,
        RestartPlan::wireguard(&settings.interface),
        restarter,
    ))
}
