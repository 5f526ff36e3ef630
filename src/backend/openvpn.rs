//! Plain `OpenVPN`: switch between `remote` lines commented out with `;`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ToggleSwitch;
use crate::codec::Dialect;
use crate::config::OpenVpnSettings;
use crate::constants;
use crate::error::{Result, SwitchError};
use crate::restart::{RestartPlan, Restarter};

/// Opens the single `*.conf` file of the `OpenVPN` config directory.
///
/// # Errors
///
/// Returns [`SwitchError::NotConfigured`] if there is none and
/// [`SwitchError::Config`] if there are several.
pub fn open(settings: &OpenVpnSettings, restarter: Restarter) -> Result<ToggleSwitch> {
    let config = find_config(&settings.config_dir)?;
    let name = config
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(ToggleSwitch::new(
        config,
        Dialect::OPENVPN_REMOTE,
        RestartPlan::openvpn(&settings.service, &settings.interface, &name),
        restarter,
    ))
}

fn find_config(dir: &Path) -> Result<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SwitchError::NotConfigured(format!("{} not found", dir.display())));
        }
        Err(e) => return Err(SwitchError::io(dir, e)),
    };

    let mut configs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(constants::EXT_CONF)
        })
        .collect();

    match configs.len() {
        0 => Err(SwitchError::NotConfigured(format!(
            "no {}/*.{} file",
            dir.display(),
            constants::EXT_CONF
        ))),
        1 => Ok(configs.remove(0)),
        n => Err(SwitchError::Config(format!(
            "found {n} {}/*.{} files; want 1",
            dir.display(),
            constants::EXT_CONF
        ))),
    }
}
