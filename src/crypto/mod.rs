//! XIU Protocol - Crypto Primitives
//!
//! - X25519 ephemeral key pairs ([`KeyPair`])
//! - Shared key derivation: X25519 + HKDF-SHA256 salted with the [`Psk`]
//! - HMAC-SHA256 tags and constant-time comparison
//! - SHA-256 content hash
//! - XChaCha20-Poly1305 cipher construction
//! - OS-backed [`RandomSource`](crate::core::RandomSource)

mod aead;
mod kdf;
mod keys;
mod mac;
mod random;

pub use aead::{SESSION_KEY_SIZE, SessionKey, new_cipher, open, seal};
pub use kdf::derive_shared;
pub use keys::{KeyPair, Psk};
pub use mac::{constant_time_eq, hash, hmac, hmac_parts};
pub use random::OsRandom;
