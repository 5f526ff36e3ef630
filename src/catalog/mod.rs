//! Mullvad relay catalog.
//!
//! Holds the most recent successfully merged relay table together with the
//! error of the last refresh attempt. The table is replaced wholesale, so a
//! reader sees either the previous complete table or the new one.

pub mod api;
pub mod refresh;

use std::sync::{Arc, PoisonError, RwLock};

use log::{info, warn};
use serde::Serialize;

use crate::error::{Result, SwitchError};

pub use api::{HttpRelaySource, RelaySource};
pub use refresh::RefreshHandle;

/// One Mullvad `WireGuard` relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relay {
    /// Short hostname from the catalog, e.g. `se-got-wg-001`.
    pub id: String,
    /// Fully qualified hostname.
    pub hostname: String,
    pub port: u16,
    pub owned: bool,
    pub country: String,
    pub city: String,
    pub public_key: String,
    /// 0 when the relay cannot be used as a multi-hop exit.
    pub multihop_port: u16,
}

impl Relay {
    /// Direct `host:port` endpoint of this relay.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// Immutable view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub relays: Arc<Vec<Relay>>,
    /// Error of the last refresh, cleared by the next success.
    pub last_error: Option<String>,
    /// Whether any refresh ever succeeded.
    pub loaded: bool,
}

impl Snapshot {
    /// The relay table, or the reason none is available yet.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Upstream`] until a refresh has succeeded.
    pub fn relays(&self) -> Result<Arc<Vec<Relay>>> {
        if self.loaded {
            return Ok(Arc::clone(&self.relays));
        }
        Err(SwitchError::Upstream(
            self.last_error
                .clone()
                .unwrap_or_else(|| crate::constants::ERR_CATALOG_NOT_LOADED.to_string()),
        ))
    }
}

/// Shared, lock-guarded relay catalog.
#[derive(Debug, Default)]
pub struct RelayCatalog {
    snapshot: RwLock<Snapshot>,
}

impl RelayCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies the outcome of one refresh.
    ///
    /// On failure the previous table stays visible and only the error is
    /// recorded.
    pub fn update(&self, outcome: Result<Vec<Relay>>) {
        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(relays) => {
                info!("relay catalog refreshed: {} relays", relays.len());
                *snapshot = Snapshot {
                    relays: Arc::new(relays),
                    last_error: None,
                    loaded: true,
                };
            }
            Err(e) => {
                warn!("relay catalog refresh failed: {e}");
                snapshot.last_error = Some(match e {
                    SwitchError::Upstream(message) => message,
                    other => other.to_string(),
                });
            }
        }
    }

    /// Resolves an endpoint to its relay chain.
    ///
    /// # Errors
    ///
    /// See [`find_relays`]; also fails while the catalog is not loaded.
    pub fn find_relays(&self, endpoint: &str) -> Result<Vec<Relay>> {
        find_relays(&self.snapshot().relays()?, endpoint)
    }
}

/// Resolves `endpoint` against a relay table.
///
/// A relay matching both host and port is a single-hop chain. Otherwise the
/// host names the entry relay and the port is the `multihop_port` of the
/// exit relay, giving `[entry, exit]`.
///
/// # Errors
///
/// Returns [`SwitchError::InvalidEndpoint`] if `endpoint` is not
/// `host:port`, [`SwitchError::Inconsistent`] if an exit matched without an
/// entry relay, and [`SwitchError::NotFound`] otherwise.
pub fn find_relays(relays: &[Relay], endpoint: &str) -> Result<Vec<Relay>> {
    let (host, port) = split_endpoint(endpoint)?;

    let mut entry = None;
    for relay in relays {
        if relay.hostname == host {
            if relay.port == port {
                return Ok(vec![relay.clone()]);
            }
            entry = Some(relay);
        }
    }

    // multihop_port 0 marks relays that cannot be a multi-hop exit.
    let exit = relays
        .iter()
        .find(|r| r.multihop_port != 0 && r.multihop_port == port);
    if let Some(exit) = exit {
        let Some(entry) = entry else {
            return Err(SwitchError::Inconsistent(format!(
                "found exit server (multihop port {port}) but not entry server {host}"
            )));
        };
        return Ok(vec![entry.clone(), exit.clone()]);
    }

    Err(SwitchError::NotFound(endpoint.to_string()))
}

/// Splits `host:port`, the host being everything before the last colon.
///
/// # Errors
///
/// Returns [`SwitchError::InvalidEndpoint`] if the port is missing or not
/// a number.
pub fn split_endpoint(endpoint: &str) -> Result<(&str, u16)> {
    let invalid = || SwitchError::InvalidEndpoint(endpoint.to_string());
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = port.parse().map_err(|_| invalid())?;
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host, port))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn relay(id: &str, multihop_port: u16) -> Relay {
        Relay {
            id: id.to_string(),
            hostname: format!("{id}.relays.mullvad.net"),
            port: 51820,
            owned: true,
            country: "Sweden".to_string(),
            city: "Gothenburg".to_string(),
            public_key: format!("key-{id}"),
            multihop_port,
        }
    }

    pub(crate) fn relays() -> Vec<Relay> {
        vec![
            relay("se-got-wg-001", 3001),
            relay("de-fra-wg-101", 3101),
            relay("us-nyc-wg-301", 0),
        ]
    }

    #[test]
    fn test_find_relays_single_hop() {
        let chain = find_relays(&relays(), "se-got-wg-001.relays.mullvad.net:51820").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].id, "se-got-wg-001");
    }

    #[test]
    fn test_find_relays_multi_hop() {
        let chain = find_relays(&relays(), "se-got-wg-001.relays.mullvad.net:3101").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, "se-got-wg-001");
        assert_eq!(chain[1].id, "de-fra-wg-101");
    }

    #[test]
    fn test_find_relays_multi_hop_unknown_entry() {
        let err = find_relays(&relays(), "nope.relays.mullvad.net:3101").unwrap_err();
        assert!(matches!(err, SwitchError::Inconsistent(_)));
        assert!(err.to_string().contains("not entry server nope.relays.mullvad.net"));
    }

    #[test]
    fn test_find_relays_not_found() {
        let err = find_relays(&relays(), "se-got-wg-001.relays.mullvad.net:9999").unwrap_err();
        assert!(matches!(err, SwitchError::NotFound(_)));
        let err = find_relays(&relays(), "1.2.3.4:51820").unwrap_err();
        assert!(matches!(err, SwitchError::NotFound(_)));
    }

    #[test]
    fn test_find_relays_port_zero_is_not_a_multihop_exit() {
        let err = find_relays(&relays(), "se-got-wg-001.relays.mullvad.net:0").unwrap_err();
        assert!(matches!(err, SwitchError::NotFound(_)));
        let err = find_relays(&relays(), "nope.relays.mullvad.net:0").unwrap_err();
        assert!(matches!(err, SwitchError::NotFound(_)));
    }

    #[test]
    fn test_find_relays_invalid_endpoint() {
        assert!(matches!(
            find_relays(&relays(), "no-port"),
            Err(SwitchError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            find_relays(&relays(), "host:http"),
            Err(SwitchError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_split_endpoint_ipv6() {
        assert_eq!(split_endpoint("[2001:db8::1]:51820").unwrap(), ("2001:db8::1", 51820));
    }

    #[test]
    fn test_catalog_not_loaded() {
        let catalog = RelayCatalog::new();
        let err = catalog.snapshot().relays().unwrap_err();
        assert_eq!(err.to_string(), "relay catalog: not loaded yet");
    }

    #[test]
    fn test_catalog_failure_keeps_previous_table() {
        let catalog = RelayCatalog::new();
        catalog.update(Ok(relays()));
        catalog.update(Err(SwitchError::Upstream("timeout".to_string())));

        let snapshot = catalog.snapshot();
        assert!(snapshot.loaded);
        assert_eq!(snapshot.relays.len(), 3);
        assert_eq!(snapshot.last_error.as_deref(), Some("timeout"));

        catalog.update(Ok(vec![relay("se-got-wg-001", 0)]));
        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.relays.len(), 1);
        assert_eq!(snapshot.last_error, None);
    }

    #[test]
    fn test_catalog_failure_before_first_load() {
        let catalog = RelayCatalog::new();
        catalog.update(Err(SwitchError::Upstream("empty APIv1 response".to_string())));
        let err = catalog.find_relays("a.relays.mullvad.net:51820").unwrap_err();
        assert!(matches!(err, SwitchError::Upstream(_)));
        assert!(err.to_string().contains("empty APIv1 response"));
    }
}
