//! XIU Protocol - Server Library
//!
//! High-level API for XIU servers.

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
