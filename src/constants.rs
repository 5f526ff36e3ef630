//! Application-wide constants and default configuration values.
//!
//! This module defines the static values used throughout exitswitch,
//! including well-known config paths, relay API endpoints, timing
//! intervals and the messages returned by the control surface.

use std::time::Duration;

// === Application Metadata ===

/// Application name (from Cargo.toml).
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Control Surface ===

/// Default address the HTTP control surface listens on.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:81";
/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "config.toml";

// === WireGuard ===

/// Config file shared by the `WireGuard` and Mullvad backends.
pub const WIREGUARD_CONFIG_PATH: &str = "/etc/wireguard/wg0.conf";
/// Network interface brought up by `wg-quick`.
pub const WIREGUARD_INTERFACE: &str = "wg0";
/// Directive holding the peer endpoint.
pub const WIREGUARD_ENDPOINT_KEYWORD: &str = "Endpoint";
/// Directive holding the peer public key.
pub const WIREGUARD_PUBLIC_KEY_KEYWORD: &str = "PublicKey";
/// Comment prefix used to disable a `WireGuard` line.
pub const WIREGUARD_COMMENT: char = '#';

// === OpenVPN ===

/// Directory scanned for a single `*.conf` `OpenVPN` config.
pub const OPENVPN_CONFIG_DIR: &str = "/etc/openvpn";
/// Network interface created by the `OpenVPN` daemon.
pub const OPENVPN_INTERFACE: &str = "tun0";
/// Init-system service managing the daemon.
pub const OPENVPN_SERVICE: &str = "openvpn";
/// Directive holding a remote server.
pub const OPENVPN_REMOTE_KEYWORD: &str = "remote";
/// Comment prefix used to disable an `OpenVPN` line.
pub const OPENVPN_COMMENT: char = ';';
/// Config file extension.
pub const EXT_CONF: &str = "conf";

// === Mullvad ===

/// Legacy relay API, the only one carrying `multihop_port`.
pub const MULLVAD_RELAYS_V1_URL: &str = "https://api.mullvad.net/public/relays/wireguard/v1/";
/// Current relay API with activity, ownership and locations.
pub const MULLVAD_RELAYS_V2_URL: &str = "https://api.mullvad.net/public/relays/wireguard/v2/";
/// Domain suffix appended to relay short names.
pub const MULLVAD_RELAY_SUFFIX: &str = ".relays.mullvad.net";
/// Default `WireGuard` port of every relay.
pub const MULLVAD_RELAY_PORT: u16 = 51820;

// === Timing Configuration ===

/// Interval between two relay catalog refreshes.
pub const RELAY_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Timeout for relay API calls in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// Delay between two interface presence checks while tearing down.
pub const TEARDOWN_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Maximum number of presence checks before giving up.
pub const TEARDOWN_MAX_POLLS: u32 = 60;

// === Messages ===

/// Body returned by successful mutating requests.
pub const MSG_OK: &str = "ok\n";
/// Error raised before the first catalog refresh completed.
pub const ERR_CATALOG_NOT_LOADED: &str = "not loaded yet";
/// Error raised when the legacy catalog is empty.
pub const ERR_EMPTY_V1: &str = "empty APIv1 response";
/// Error raised when the current catalog is empty.
pub const ERR_EMPTY_V2: &str = "empty APIv2 response";
