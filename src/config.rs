//! YAML configuration files.
//!
//! ```yaml
//! # server.yaml
//! listen: 0.0.0.0:51820
//! psk: correct horse battery staple
//! pending_ttl_secs: 30        # optional
//! address_binding: strict     # optional, default advisory
//! ```
//!
//! ```yaml
//! # client.yaml
//! server: vpn.example.com:51820
//! psk: correct horse battery staple
//! handshake_timeout_secs: 5   # optional
//! keepalive_interval_secs: 25 # optional
//! ```
//!
//! Keys not listed here are ignored.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::ConfigError;

#[cfg(feature = "server")]
use std::net::{SocketAddr, ToSocketAddrs};
#[cfg(any(feature = "server", feature = "client"))]
use std::time::Duration;

#[cfg(feature = "client")]
use crate::client::ClientConfig;
#[cfg(feature = "client")]
use crate::core::{HANDSHAKE_TIMEOUT, KEEPALIVE_INTERVAL};
#[cfg(feature = "server")]
use crate::handshake::AddressBinding;
#[cfg(feature = "server")]
use crate::server::ServerConfig;

#[cfg(feature = "server")]
#[derive(Debug, Deserialize)]
struct RawServerConfig {
    listen: String,
    psk: String,
    #[serde(default)]
    pending_ttl_secs: Option<u64>,
    #[serde(default)]
    address_binding: AddressBinding,
}

#[cfg(feature = "client")]
#[derive(Debug, Deserialize)]
struct RawClientConfig {
    server: String,
    psk: String,
    #[serde(default)]
    handshake_timeout_secs: Option<u64>,
    #[serde(default)]
    keepalive_interval_secs: Option<u64>,
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(yaml: &str) -> Result<T, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load a server config file.
#[cfg(feature = "server")]
pub fn load_server(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
    parse_server(&read(path.as_ref())?)
}

/// Parse a server config from YAML text.
///
/// `listen` is resolved immediately.
#[cfg(feature = "server")]
pub fn parse_server(yaml: &str) -> Result<ServerConfig, ConfigError> {
    let raw: RawServerConfig = parse(yaml)?;
    let bind_addr = resolve(&raw.listen)?;

    Ok(ServerConfig {
        bind_addr,
        psk: raw.psk.into(),
        pending_ttl: raw.pending_ttl_secs.map(Duration::from_secs),
        address_binding: raw.address_binding,
    })
}

/// Load a client config file.
#[cfg(feature = "client")]
pub fn load_client(path: impl AsRef<Path>) -> Result<ClientConfig, ConfigError> {
    parse_client(&read(path.as_ref())?)
}

/// Parse a client config from YAML text.
///
/// `server` is kept as text and resolved at connect time.
#[cfg(feature = "client")]
pub fn parse_client(yaml: &str) -> Result<ClientConfig, ConfigError> {
    let raw: RawClientConfig = parse(yaml)?;

    Ok(ClientConfig {
        server: raw.server,
        psk: raw.psk.into(),
        handshake_timeout: seconds(
            "handshake_timeout_secs",
            raw.handshake_timeout_secs,
            HANDSHAKE_TIMEOUT,
        )?,
        keepalive_interval: seconds(
            "keepalive_interval_secs",
            raw.keepalive_interval_secs,
            KEEPALIVE_INTERVAL,
        )?,
    })
}

#[cfg(feature = "client")]
fn seconds(key: &str, value: Option<u64>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(0) => Err(ConfigError::Invalid(format!("{key} must be non-zero"))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(feature = "server")]
fn resolve(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::Resolve(addr.to_string()))
}
