//! Mullvad relay API client.
//!
//! The legacy v1 catalog is the only one carrying `multihop_port`; the v2
//! catalog adds activity, ownership and named locations. Both are fetched
//! and merged into a single relay table.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::Relay;
use crate::constants;
use crate::error::{Result, SwitchError};

#[derive(Debug, Default, Deserialize)]
pub struct V1Response {
    #[serde(default)]
    pub countries: Vec<V1Country>,
}

#[derive(Debug, Default, Deserialize)]
pub struct V1Country {
    #[serde(default)]
    pub cities: Vec<V1City>,
}

#[derive(Debug, Default, Deserialize)]
pub struct V1City {
    #[serde(default)]
    pub relays: Vec<V1Relay>,
}

#[derive(Debug, Default, Deserialize)]
pub struct V1Relay {
    pub hostname: String,
    #[serde(default)]
    pub multihop_port: u16,
}

#[derive(Debug, Default, Deserialize)]
pub struct V2Response {
    #[serde(default)]
    pub locations: HashMap<String, V2Location>,
    #[serde(default)]
    pub wireguard: V2WireGuard,
}

#[derive(Debug, Default, Deserialize)]
pub struct V2Location {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct V2WireGuard {
    #[serde(default)]
    pub relays: Vec<V2Relay>,
}

#[derive(Debug, Default, Deserialize)]
pub struct V2Relay {
    pub hostname: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub public_key: String,
}

/// Anything able to produce a fresh relay table.
pub trait RelaySource: Send + Sync {
    /// Fetches and merges the relay catalogs.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Upstream`] on transport, decode or empty
    /// payload failures.
    fn fetch(&self) -> Result<Vec<Relay>>;
}

/// Fetches both catalogs over HTTPS.
pub struct HttpRelaySource {
    client: Client,
    v1_url: String,
    v2_url: String,
}

impl HttpRelaySource {
    /// Builds the HTTP client used for every refresh.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Upstream`] if the client cannot be built.
    pub fn new(v1_url: &str, v2_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()
            .map_err(|e| SwitchError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            v1_url: v1_url.to_string(),
            v2_url: v2_url.to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SwitchError::Upstream(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(SwitchError::Upstream(format!(
                "{url}: server returned {}",
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| SwitchError::Upstream(format!("{url}: {e}")))
    }
}

impl RelaySource for HttpRelaySource {
    fn fetch(&self) -> Result<Vec<Relay>> {
        let v1: V1Response = self.get(&self.v1_url)?;
        ensure_v1_not_empty(&v1)?;
        let v2: V2Response = self.get(&self.v2_url)?;
        merge(&v1, &v2)
    }
}

/// Rejects an empty legacy catalog before the v2 catalog is requested.
fn ensure_v1_not_empty(v1: &V1Response) -> Result<()> {
    if v1.countries.is_empty() {
        return Err(SwitchError::Upstream(constants::ERR_EMPTY_V1.to_string()));
    }
    Ok(())
}

/// Joins the two catalogs into the relay table.
///
/// Only relays active in v2 are kept. The multihop port comes from v1 by
/// short hostname (0 when absent), the country and city from the v2
/// location map (empty when absent).
///
/// # Errors
///
/// Returns [`SwitchError::Upstream`] if the v2 catalog has no relays.
pub fn merge(v1: &V1Response, v2: &V2Response) -> Result<Vec<Relay>> {
    if v2.wireguard.relays.is_empty() {
        return Err(SwitchError::Upstream(constants::ERR_EMPTY_V2.to_string()));
    }

    let multihop_ports: HashMap<&str, u16> = v1
        .countries
        .iter()
        .flat_map(|country| &country.cities)
        .flat_map(|city| &city.relays)
        .map(|relay| (relay.hostname.as_str(), relay.multihop_port))
        .collect();

    Ok(v2
        .wireguard
        .relays
        .iter()
        .filter(|relay| relay.active)
        .map(|relay| {
            let location = v2.locations.get(&relay.location);
            Relay {
                id: relay.hostname.clone(),
                hostname: format!("{}{}", relay.hostname, constants::MULLVAD_RELAY_SUFFIX),
                port: constants::MULLVAD_RELAY_PORT,
                owned: relay.owned,
                country: location.map(|l| l.country.clone()).unwrap_or_default(),
                city: location.map(|l| l.city.clone()).unwrap_or_default(),
                public_key: relay.public_key.clone(),
                multihop_port: multihop_ports
                    .get(relay.hostname.as_str())
                    .copied()
                    .unwrap_or(0),
            }
        })
        .collect())
}
