//! Shared key derivation
//!
//! ```text
//! dh  = X25519(private, peer_public)
//! key = HKDF-SHA256(ikm = dh, salt = psk, info = "", L = 32)
//! ```
//!
//! Both parties feed their own private key and the other side's public key,
//! so they arrive at the same 32 bytes.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use super::{Psk, SessionKey, SESSION_KEY_SIZE};
use crate::core::{CryptoError, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// Derive the session key from a local private key and a peer public key.
///
/// # Errors
/// `KeyAgreementFailed` if the peer key is a low-order point (all-zero DH
/// output); `KeyDerivationFailed` if HKDF rejects the output length.
pub fn derive_shared(
    private: &[u8; PRIVATE_KEY_SIZE],
    peer_public: &[u8; PUBLIC_KEY_SIZE],
    psk: &Psk,
) -> Result<SessionKey, CryptoError> {
    let secret = StaticSecret::from(*private);
    let shared = secret.diffie_hellman(&PublicKey::from(*peer_public));
    if !shared.was_contributory() {
        return Err(CryptoError::KeyAgreementFailed);
    }

    let hk = Hkdf::<Sha256>::new(Some(psk.as_bytes()), shared.as_bytes());
    let mut key = [0u8; SESSION_KEY_SIZE];
    hk.expand(&[], &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;

    Ok(SessionKey::from_bytes(key))
}
