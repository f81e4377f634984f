//! Error types for the XIU protocol.

use std::io;

use thiserror::Error;

/// Errors in the wire codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Datagram shorter than the fixed header.
    #[error("short packet: {len} bytes")]
    ShortPacket {
        /// Length of the rejected input.
        len: usize,
    },
}

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The secure random source could not produce bytes.
    #[error("secure random source failed")]
    RandomSourceFailure,

    /// Diffie-Hellman produced an all-zero output (low-order peer point).
    #[error("key agreement failed (non-contributory peer key)")]
    KeyAgreementFailed,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// Cipher key had the wrong length.
    #[error("invalid key length")]
    InvalidKeyLength,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,
}

/// Errors in the handshake layer.
///
/// Responder-side failures never produce a datagram: the caller drops the
/// packet so an unauthenticated peer learns nothing from probing.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Payload has the wrong size for its packet type.
    #[error("malformed payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Required payload size (minimum for Init/Resp, exact for Finish).
        expected: usize,
        /// Observed payload size.
        actual: usize,
    },

    /// Init carried a tag that does not match HMAC(psk, public key).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Another Init from the same IP was accepted too recently.
    #[error("rate limited")]
    RateLimited,

    /// Finish carried a cookie with no pending handshake.
    #[error("unknown cookie")]
    UnknownCookie,

    /// Finish arrived from a different IP than the Init (strict binding only).
    #[error("finish source address does not match init")]
    AddressMismatch,

    /// No Resp arrived before the deadline.
    #[error("handshake timed out")]
    Timeout,

    /// Datagram could not be decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Crypto primitive failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Socket error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl HandshakeError {
    /// Check if this error should result in a silent drop (no response sent).
    pub fn is_silent_drop(&self) -> bool {
        matches!(
            self,
            HandshakeError::MalformedPayload { .. }
                | HandshakeError::AuthenticationFailed
                | HandshakeError::RateLimited
                | HandshakeError::UnknownCookie
                | HandshakeError::AddressMismatch
                | HandshakeError::Wire(_)
        )
    }

    /// Check if this error points at a forged or replayed message.
    pub fn is_security_error(&self) -> bool {
        matches!(
            self,
            HandshakeError::AuthenticationFailed
                | HandshakeError::UnknownCookie
                | HandshakeError::AddressMismatch
        )
    }
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: io::Error,
    },

    /// Config file is not valid YAML for the expected shape.
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Server address did not resolve.
    #[error("cannot resolve address {0}")]
    Resolve(String),

    /// A value parsed but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level XIU errors.
#[derive(Debug, Error)]
pub enum XiuError {
    /// Handshake error.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_drop_errors() {
        assert!(HandshakeError::AuthenticationFailed.is_silent_drop());
        assert!(HandshakeError::RateLimited.is_silent_drop());
        assert!(HandshakeError::UnknownCookie.is_silent_drop());
        assert!(
            HandshakeError::MalformedPayload {
                expected: 64,
                actual: 3
            }
            .is_silent_drop()
        );
        assert!(HandshakeError::Wire(WireError::ShortPacket { len: 2 }).is_silent_drop());

        assert!(!HandshakeError::Timeout.is_silent_drop());
        assert!(!HandshakeError::Crypto(CryptoError::RandomSourceFailure).is_silent_drop());
    }

    #[test]
    fn test_security_errors() {
        assert!(HandshakeError::AuthenticationFailed.is_security_error());
        assert!(HandshakeError::UnknownCookie.is_security_error());
        assert!(!HandshakeError::RateLimited.is_security_error());
        assert!(!HandshakeError::Timeout.is_security_error());
    }

    #[test]
    fn test_error_display() {
        let err = HandshakeError::MalformedPayload {
            expected: 16,
            actual: 15,
        };
        assert_eq!(
            err.to_string(),
            "malformed payload: expected 16 bytes, got 15"
        );
        assert_eq!(
            WireError::ShortPacket { len: 4 }.to_string(),
            "short packet: 4 bytes"
        );
    }
}
