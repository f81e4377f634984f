//! XIU Protocol - Transport Layer
//!
//! Datagram transport for handshake and control packets. [`TunnelSocket`]
//! wraps a tokio UDP socket and adds a receive with a hard deadline, which
//! the client bootstrap uses to bound its wait for a handshake response.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Client / Server drivers          │
//! ├─────────────────────────────────────────┤
//! │     Handshake (Initiator/Responder)     │
//! ├─────────────────────────────────────────┤
//! │          Transport Layer                │  ← This module
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

mod socket;

pub use socket::*;
