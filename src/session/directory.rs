//! Peer address to session map.
//!
//! Mutated only by handshake completion ([`SessionDirectory::install`]) and
//! keepalive receipt ([`SessionDirectory::touch`]). Sessions are never torn
//! down.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::crypto::SessionKey;

/// Established session with one peer.
#[derive(Debug, Clone)]
pub struct Session {
    peer: SocketAddr,
    key: SessionKey,
    last_seen: Instant,
    keyed_at: Instant,
    generation: u64,
}

impl Session {
    fn new(peer: SocketAddr, key: SessionKey, generation: u64, now: Instant) -> Self {
        Self {
            peer,
            key,
            last_seen: now,
            keyed_at: now,
            generation,
        }
    }

    /// Address of the peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Current symmetric key.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Last time the peer was heard from (handshake or keepalive).
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// When the current key was installed.
    pub fn keyed_at(&self) -> Instant {
        self.keyed_at
    }

    /// Number of keys installed for this peer, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time since the peer was last heard from.
    pub fn idle_time(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Age of the current key.
    pub fn age(&self) -> Duration {
        self.keyed_at.elapsed()
    }
}

/// Thread-safe directory of sessions keyed by peer address.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: Mutex<HashMap<SocketAddr, Session>>,
}

impl SessionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `key` for `peer`, replacing any previous session.
    ///
    /// Returns the new generation.
    pub fn install(&self, peer: SocketAddr, key: SessionKey) -> u64 {
        let now = Instant::now();
        let mut sessions = self.lock();
        let generation = sessions.get(&peer).map_or(1, |s| s.generation + 1);
        sessions.insert(peer, Session::new(peer, key, generation, now));
        generation
    }

    /// Refresh `last_seen` for `peer`. Returns `false` if there is no session.
    pub fn touch(&self, peer: SocketAddr) -> bool {
        match self.lock().get_mut(&peer) {
            Some(session) => {
                session.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Snapshot of the session for `peer`.
    pub fn get(&self, peer: SocketAddr) -> Option<Session> {
        self.lock().get(&peer).cloned()
    }

    /// Current key for `peer`.
    pub fn key(&self, peer: SocketAddr) -> Option<SessionKey> {
        self.lock().get(&peer).map(|s| s.key.clone())
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the directory holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Addresses of all peers with a session.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.lock().keys().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
