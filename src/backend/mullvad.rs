//! Mullvad `WireGuard`: switch between relays fetched from the Mullvad API.
//!
//! The config holds a single active `Endpoint`; switching rewrites it and
//! the paired `PublicKey` with the key of the exit relay. An endpoint whose
//! port is a relay's `multihop_port` selects a two-hop chain: the host is
//! the entry relay, the port picks the exit relay.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::info;
use serde::Serialize;

use super::Switchable;
use crate::catalog::{self, RefreshHandle, Relay, RelayCatalog, RelaySource};
use crate::codec::{ConfigFile, Dialect};
use crate::constants;
use crate::error::{Result, SwitchError};
use crate::restart::{RestartPlan, Restarter};

/// Everything the Mullvad index page shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexView {
    pub current: String,
    /// `[relay]` for single-hop, `[entry, exit]` for multi-hop, empty if
    /// the current endpoint is not a known relay.
    pub chain: Vec<Relay>,
    /// Sorted by country, city, hostname.
    pub relays: Vec<Relay>,
    /// Error of the last catalog refresh; the relays may be stale.
    pub last_error: Option<String>,
}

/// Mullvad exit selector.
pub struct MullvadBackend {
    path: PathBuf,
    catalog: Arc<RelayCatalog>,
    plan: RestartPlan,
    restarter: Restarter,
    lock: Mutex<()>,
    refresh: Option<RefreshHandle>,
}

impl MullvadBackend {
    /// Opens the `WireGuard` config if its current endpoint is a Mullvad
    /// relay. The relay catalog starts empty; see [`Self::start_refresh`].
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::NotConfigured`] if the config is absent or
    /// does not point to a Mullvad relay.
    pub fn open(path: &Path, interface: &str, restarter: Restarter) -> Result<Self> {
        if !path.is_file() {
            return Err(SwitchError::NotConfigured(format!(
                "{} not found",
                path.display()
            )));
        }
        let backend = Self {
            path: path.to_path_buf(),
            catalog: Arc::new(RelayCatalog::new()),
            plan: RestartPlan::wireguard(interface),
            restarter,
            lock: Mutex::new(()),
            refresh: None,
        };

        let current = backend
            .current()
            .map_err(|e| SwitchError::NotConfigured(e.to_string()))?;
        match catalog::split_endpoint(&current) {
            Ok((host, _)) if host.ends_with(constants::MULLVAD_RELAY_SUFFIX) => Ok(backend),
            _ => Err(SwitchError::NotConfigured(format!(
                "current endpoint {current:?} is not a Mullvad relay"
            ))),
        }
    }

    /// Refreshes the relay catalog in the background, now and then every
    /// `interval`.
    pub fn start_refresh(&mut self, source: Arc<dyn RelaySource>, interval: Duration) {
        self.refresh = Some(RefreshHandle::spawn(
            Arc::clone(&self.catalog),
            source,
            interval,
        ));
    }

    /// Refreshes the relay catalog on the calling thread.
    pub fn refresh_now(&self, source: &dyn RelaySource) {
        self.catalog.update(source.fetch());
    }

    #[must_use]
    pub fn catalog(&self) -> &RelayCatalog {
        &self.catalog
    }

    fn load(&self) -> Result<ConfigFile> {
        ConfigFile::load(
            &self.path,
            &[Dialect::WIREGUARD_ENDPOINT, Dialect::WIREGUARD_PUBLIC_KEY],
        )
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be read or no catalog was
    /// ever loaded.
    pub fn index_view(&self) -> Result<IndexView> {
        let current = self.current()?;
        let snapshot = self.catalog.snapshot();
        let relays = snapshot.relays()?;

        let chain = catalog::find_relays(&relays, &current).unwrap_or_default();
        let mut relays = relays.to_vec();
        relays.sort_by(by_location);

        Ok(IndexView {
            current,
            chain,
            relays,
            last_error: snapshot.last_error,
        })
    }
}

fn by_location(a: &Relay, b: &Relay) -> Ordering {
    a.country
        .cmp(&b.country)
        .then_with(|| a.city.cmp(&b.city))
        .then_with(|| a.hostname.cmp(&b.hostname))
}

impl Switchable for MullvadBackend {
    fn current(&self) -> Result<String> {
        Ok(self
            .load()?
            .current(&Dialect::WIREGUARD_ENDPOINT)
            .unwrap_or_default()
            .to_string())
    }

    fn list(&self) -> Result<Vec<String>> {
        let relays = self.catalog.snapshot().relays()?;
        Ok(relays.iter().map(Relay::endpoint).collect())
    }

    fn switch(&self, server: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.load()?;
        if file.current(&Dialect::WIREGUARD_ENDPOINT) == Some(server) {
            info!("{server} is already the current server");
            return Ok(());
        }

        let chain = self.catalog.find_relays(server)?;
        let exit = chain
            .last()
            .ok_or_else(|| SwitchError::NotFound(server.to_string()))?;

        if file.set_value(&Dialect::WIREGUARD_ENDPOINT, server) == 0 {
            return Err(SwitchError::Inconsistent(format!(
                "no active {} line in {}",
                constants::WIREGUARD_ENDPOINT_KEYWORD,
                self.path.display()
            )));
        }
        if file.set_value(&Dialect::WIREGUARD_PUBLIC_KEY, &exit.public_key) == 0 {
            return Err(SwitchError::Inconsistent(format!(
                "no active {} line in {}",
                constants::WIREGUARD_PUBLIC_KEY_KEYWORD,
                self.path.display()
            )));
        }
        file.store(&self.path)?;

        info!(
            "switched to {server} (exit {}, {} hop(s)), restarting",
            exit.id,
            chain.len()
        );
        self.restarter.restart(&self.plan)
    }
}
