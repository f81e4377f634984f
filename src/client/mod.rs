//! XIU Protocol - Client Library
//!
//! High-level API for XIU clients.

mod bootstrap;
#[allow(clippy::module_inception)]
mod client;

pub use bootstrap::*;
pub use client::*;
