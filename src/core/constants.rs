//! Protocol constants.
//!
//! Sizes and timings are part of the wire contract between client and server
//! and MUST NOT be changed independently on one side.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Symmetric key size (derived session key, cookie secret).
pub const KEY_SIZE: usize = 32;

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// HMAC-SHA256 tag size.
pub const MAC_SIZE: usize = 32;

/// SHA-256 output size.
pub const HASH_SIZE: usize = 32;

/// Truncated cookie size carried in Resp and Finish.
pub const COOKIE_SIZE: usize = 16;

/// XChaCha20 nonce size.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

// =============================================================================
// PACKET SIZES
// =============================================================================

/// Header size (type + counter).
pub const HEADER_SIZE: usize = 1 + 8;

/// Handshake init payload: initiator public key || HMAC(psk, public key).
pub const INIT_PAYLOAD_SIZE: usize = PUBLIC_KEY_SIZE + MAC_SIZE;

/// Handshake response payload: responder public key || cookie.
pub const RESP_PAYLOAD_SIZE: usize = PUBLIC_KEY_SIZE + COOKIE_SIZE;

/// Handshake finish payload: cookie.
pub const FINISH_PAYLOAD_SIZE: usize = COOKIE_SIZE;

/// Largest datagram we ever read.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

// =============================================================================
// TIMING CONSTANTS
// =============================================================================

/// Minimum spacing between accepted Inits from one source IP.
pub const INIT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);

/// How long the initiator waits for a Resp.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client keepalive period.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// How often the server sweeps pending state when a TTL is configured.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(10);
