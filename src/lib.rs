//! # XIU
//!
//! PSK-authenticated ephemeral key exchange over UDP for point-to-point
//! tunnels.
//!
//! A client and a server that share a pre-shared key (PSK) run a three
//! message handshake over UDP, each contributing an ephemeral X25519 key
//! pair, and end up with the same 32-byte session key. The server answers
//! handshakes statelessly until the client proves it saw the server's reply
//! (the cookie), rate-limits handshake attempts per source IP and never
//! replies to a packet it cannot authenticate. The client keeps the session
//! alive and re-keys when the server asks.
//!
//! ## Feature Flags
//!
//! - `transport` (default): tokio UDP socket wrapper
//! - `crypto` (default): X25519, HKDF-SHA256, HMAC-SHA256, XChaCha20-Poly1305
//!   and the handshake state machines built on them
//! - `client` (default): [`client::TunnelClient`]
//! - `server` (default): [`server::TunnelServer`]
//!
//! ## Modules
//!
//! - [`core`]: Constants, traits and error types (always included)
//! - [`wire`]: Packet codec (always included)
//! - [`crypto`]: Crypto primitives (requires `crypto` feature)
//! - [`handshake`]: Initiator and responder (requires `crypto` feature)
//! - [`session`]: Session directory (requires `crypto` feature)
//! - [`transport`]: UDP socket (requires `transport` feature)
//! - [`client`] / [`server`]: I/O drivers
//! - [`config`]: YAML configuration files
//!
//! ## Example Usage
//!
//! ```rust
//! use std::net::SocketAddr;
//! use xiu::prelude::*;
//!
//! let psk = Psk::from("correct horse battery staple");
//! let responder = Responder::new(psk.clone()).unwrap();
//! let initiator = Initiator::new(&psk, 1).unwrap();
//! let client: SocketAddr = "10.0.0.1:1234".parse().unwrap();
//!
//! let resp = responder.handle_init(client, &initiator.init_packet().unwrap()).unwrap();
//! let (finish, client_key) = initiator.finish(&resp).unwrap();
//! let server_key = responder.handle_finish(client, &finish).unwrap();
//!
//! assert_eq!(client_key.as_bytes(), server_key.as_bytes());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec (always included)
pub mod wire;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Handshake state machines (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod handshake;

// Session directory (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod session;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

// Configuration files
#[cfg(any(feature = "client", feature = "server"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "client", feature = "server"))))]
pub mod config;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::wire::*;

    #[cfg(feature = "crypto")]
    pub use crate::crypto::{KeyPair, OsRandom, Psk, SessionKey};

    #[cfg(feature = "crypto")]
    pub use crate::handshake::*;

    #[cfg(feature = "crypto")]
    pub use crate::session::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::TunnelSocket;

    #[cfg(feature = "client")]
    pub use crate::client::{ClientConfig, ClientError, TunnelClient, TunnelClientBuilder};

    #[cfg(feature = "server")]
    pub use crate::server::{ServerConfig, ServerError, TunnelServer, TunnelServerBuilder};
}

// Re-export commonly used items at crate root
pub use core::{ConfigError, CryptoError, HandshakeError, WireError, XiuError};
pub use wire::{Packet, PacketType};

#[cfg(feature = "crypto")]
pub use crypto::{Psk, SessionKey};

#[cfg(feature = "crypto")]
pub use handshake::{AddressBinding, Initiator, Responder};
