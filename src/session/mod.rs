//! XIU Protocol - Sessions
//!
//! Both ends keep a [`SessionDirectory`]: the server holds one entry per
//! client, the client holds a single entry for its server.

mod directory;

pub use directory::{Session, SessionDirectory};
