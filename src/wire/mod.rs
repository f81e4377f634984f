//! XIU wire codec.
//!
//! Fixed 9-byte header followed by a type-specific payload. See [`Packet`].

mod packet;

pub use packet::*;
