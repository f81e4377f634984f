//! Core traits for the XIU protocol.
//!
//! These are the seams where the handshake meets the outside world.

use super::error::CryptoError;

/// A cryptographically secure source of random bytes.
///
/// Every ephemeral key pair and the responder's cookie secret are drawn from
/// an implementation of this trait. Failure is reported, never papered over:
/// a handshake cannot proceed without entropy.
///
/// # Example
///
/// ```ignore
/// struct Zeros;
///
/// impl RandomSource for Zeros {
///     fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
///         buf.fill(0);
///         Ok(())
///     }
/// }
/// ```
pub trait RandomSource: Send + Sync {
    /// Fill `buf` entirely with random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError>;
}

impl<R: RandomSource + ?Sized> RandomSource for &R {
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        (**self).fill(buf)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for std::sync::Arc<R> {
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        (**self).fill(buf)
    }
}
