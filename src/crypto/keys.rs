//! X25519 key management
//!
//! Ephemeral key pairs for the handshake and the pre-shared key.

use std::fmt;

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::kdf::derive_shared;
use super::SessionKey;
use crate::core::{CryptoError, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, RandomSource};

/// An ephemeral X25519 keypair, generated fresh for every handshake attempt.
///
/// The private key is zeroized on drop.
pub struct KeyPair {
    /// Private key (32 bytes) - zeroized on drop
    private: [u8; PRIVATE_KEY_SIZE],
    /// Public key (32 bytes)
    public: [u8; PUBLIC_KEY_SIZE],
}

impl KeyPair {
    /// Generate a new random keypair from `rng`.
    ///
    /// # Errors
    /// Returns `RandomSourceFailure` if `rng` cannot produce bytes.
    pub fn generate<R: RandomSource + ?Sized>(rng: &R) -> Result<Self, CryptoError> {
        let mut private = [0u8; PRIVATE_KEY_SIZE];
        if let Err(e) = rng.fill(&mut private) {
            private.zeroize();
            return Err(e);
        }
        Ok(Self::from_private(private))
    }

    /// Build a keypair from a private scalar, computing its public point.
    pub fn from_private(private: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(private);
        let public = PublicKey::from(&secret).to_bytes();
        Self { private, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Get the private key.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.private
    }

    /// Derive the session key shared with `peer_public` under `psk`.
    pub fn derive_shared(
        &self,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
        psk: &Psk,
    ) -> Result<SessionKey, CryptoError> {
        derive_shared(&self.private, peer_public, psk)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(&self.public[..4]))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Pre-shared key known to both ends before any handshake.
///
/// Zeroized on drop and never printed.
#[derive(Clone, Default)]
pub struct Psk(Vec<u8>);

impl Psk {
    /// Create a PSK from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if the PSK is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Psk {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for Psk {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Drop for Psk {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Psk([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::OsRandom;

    struct Broken;

    impl RandomSource for Broken {
        fn fill(&self, _buf: &mut [u8]) -> Result<(), CryptoError> {
            Err(CryptoError::RandomSourceFailure)
        }
    }

    #[test]
    fn test_keypair_generation() {
        let kp1 = KeyPair::generate(&OsRandom).unwrap();
        let kp2 = KeyPair::generate(&OsRandom).unwrap();

        assert_ne!(kp1.public_key(), kp2.public_key());
        assert_ne!(kp1.private_key(), kp2.private_key());
    }

    #[test]
    fn test_public_key_matches_base_point_mult() {
        // RFC 7748 section 6.1, Alice's key pair.
        let private: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let kp = KeyPair::from_private(private);
        assert_eq!(
            hex::encode(kp.public_key()),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn test_random_failure_propagates() {
        assert_eq!(
            KeyPair::generate(&Broken).unwrap_err(),
            CryptoError::RandomSourceFailure
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let kp = KeyPair::from_private([7u8; 32]);
        assert!(format!("{:?}", kp).contains("[REDACTED]"));
        assert_eq!(format!("{:?}", Psk::from("hunter2")), "Psk([REDACTED])");
    }
}
