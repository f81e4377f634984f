//! XIU Protocol - Handshake
//!
//! Three messages establish a session key from a pre-shared key and two
//! ephemeral X25519 key pairs:
//!
//! ```text
//! Init   (1)  initiator -> responder   e_i || HMAC(psk, e_i)
//! Resp   (2)  responder -> initiator   e_r || cookie
//! Finish (3)  initiator -> responder   cookie
//! ```
//!
//! Both sides then hold `HKDF-SHA256(ikm = DH(e, e'), salt = psk)`.

mod initiator;
mod responder;

pub use initiator::Initiator;
pub use responder::{AddressBinding, Cookie, Responder};
