//! XChaCha20-Poly1305 AEAD construction
//!
//! The handshake yields a 32-byte [`SessionKey`]; [`new_cipher`] turns it into
//! an AEAD with a 24-byte nonce space. Seal and open are independent
//! operations on the returned cipher.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::Zeroize;

use crate::core::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError};

/// Size of the session key (32 bytes for XChaCha20)
pub const SESSION_KEY_SIZE: usize = 32;

/// A session key produced by the handshake.
///
/// Zeroized on drop for security.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Create a new session key from bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }

    /// Short non-secret identifier for logs (first bytes of SHA-256(key)).
    pub fn fingerprint(&self) -> String {
        hex::encode(&super::hash(&self.key)[..4])
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Build an XChaCha20-Poly1305 cipher from raw key bytes.
///
/// # Errors
/// `InvalidKeyLength` unless `key` is exactly 32 bytes.
pub fn new_cipher(key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
    XChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)
}

/// Encrypt plaintext using XChaCha20-Poly1305.
///
/// # Returns
/// Ciphertext with appended 16-byte Poly1305 tag
pub fn seal(
    cipher: &XChaCha20Poly1305,
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext using XChaCha20-Poly1305.
///
/// # Returns
/// Decrypted plaintext, or error if authentication fails
pub fn open(
    cipher: &XChaCha20Poly1305,
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}
