//! Boot-time backend selection.

use std::sync::Arc;

use log::{debug, info};

use super::{mullvad::MullvadBackend, openvpn, wireguard, Backend, BackendKind};
use crate::catalog::RelaySource;
use crate::config::Settings;
use crate::error::{Result, SwitchError};
use crate::restart::Restarter;

/// How the Mullvad relay catalog is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Fetch now and then periodically on a background thread.
    Background,
    /// Fetch once on the calling thread, for one-shot commands.
    Once,
}

/// Opens one backend. Mullvad loads its relay catalog from `source`.
///
/// # Errors
///
/// Returns [`SwitchError::NotConfigured`] if the backend's config is
/// absent, or any error raised while probing it.
pub fn open(
    kind: BackendKind,
    settings: &Settings,
    restarter: Restarter,
    source: Arc<dyn RelaySource>,
    refresh: Refresh,
) -> Result<Backend> {
    match kind {
        BackendKind::Mullvad => {
            let mut backend = MullvadBackend::open(
                &settings.wireguard.config_path,
                &settings.wireguard.interface,
                restarter,
            )?;
            match refresh {
                Refresh::Background => {
                    backend.start_refresh(source, settings.mullvad.refresh_interval());
                }
                Refresh::Once => backend.refresh_now(source.as_ref()),
            }
            Ok(Backend::Mullvad(backend))
        }
        BackendKind::OpenVpn => openvpn::open(&settings.openvpn, restarter).map(Backend::OpenVpn),
        BackendKind::WireGuard => {
            wireguard::open(&settings.wireguard, restarter).map(Backend::WireGuard)
        }
    }
}

/// Selects the backend forced by `settings.backend`, or the first
/// configured one in Mullvad, `OpenVPN`, `WireGuard` order.
///
/// # Errors
///
/// Returns [`SwitchError::NotConfigured`] if no backend is configured, or
/// the first probing error other than "not configured".
pub fn resolve(
    settings: &Settings,
    restarter: &Restarter,
    source: &Arc<dyn RelaySource>,
    refresh: Refresh,
) -> Result<Backend> {
    if let Some(kind) = settings.backend {
        let backend = open(kind, settings, restarter.clone(), Arc::clone(source), refresh)?;
        info!("using {kind} (forced)");
        return Ok(backend);
    }

    for kind in BackendKind::ALL {
        match open(kind, settings, restarter.clone(), Arc::clone(source), refresh) {
            Ok(backend) => {
                info!("using {kind}");
                return Ok(backend);
            }
            Err(e) if e.is_not_configured() => debug!("{kind}: {e}"),
            Err(e) => return Err(e),
        }
    }
    Err(SwitchError::NotConfigured("no supported VPN found".to_string()))
}
