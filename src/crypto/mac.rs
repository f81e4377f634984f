//! HMAC-SHA256 tags, SHA-256 digests and constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::core::{CryptoError, HASH_SIZE, MAC_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 of `data` under `key`.
pub fn hmac(key: &[u8], data: &[u8]) -> Result<[u8; MAC_SIZE], CryptoError> {
    hmac_parts(key, &[data])
}

/// Compute HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_parts(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_SIZE], CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Compute SHA-256 of `data`.
pub fn hash(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

/// Compare two byte strings in constant time.
///
/// Running time depends only on the lengths, never on where the contents
/// differ. Different lengths compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_rfc4231_case_2() {
        let tag = hmac(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_parts_matches_concatenation() {
        let whole = hmac(b"key", b"hello world").unwrap();
        let split = hmac_parts(b"key", &[b"hello", b" ", b"world"]).unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn test_hash_abc() {
        assert_eq!(
            hex::encode(hash(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        let a = [0x5Au8; 32];
        assert!(constant_time_eq(&a, &a.clone()));

        for i in 0..a.len() {
            let mut b = a;
            b[i] ^= 0x01;
            assert!(!constant_time_eq(&a, &b), "difference at {i} not detected");
        }

        assert!(!constant_time_eq(&a, &a[..31]));
        assert!(!constant_time_eq(&a[..1], &[]));
        assert!(constant_time_eq(&[], &[]));
    }
}
