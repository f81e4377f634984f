//! Server side of the handshake.
//!
//! ```text
//! initiator                                responder
//!   Init   { e_i, HMAC(psk, e_i) }  ------>  verify tag, rate limit,
//!                                            cookie = HMAC(ck, ip || e_i)[..16]
//!                                   <------  Resp { e_r, cookie }
//!   Finish { cookie }               ------>  take pending[cookie]
//!                                            key = HKDF(DH(e_r, e_i), psk)
//! ```
//!
//! Nothing is allocated for a peer until its Init proves knowledge of the PSK,
//! and the key is only derived once the peer echoes the cookie it was sent.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroize;

use crate::core::{
    COOKIE_SIZE, CryptoError, FINISH_PAYLOAD_SIZE, HandshakeError, INIT_PAYLOAD_SIZE,
    INIT_RATE_LIMIT_WINDOW, KEY_SIZE, PUBLIC_KEY_SIZE, RandomSource,
};
use crate::crypto::{KeyPair, OsRandom, Psk, SessionKey, constant_time_eq, hmac, hmac_parts};
use crate::wire::{Packet, PacketType};

/// Anti-DoS cookie handed out in Resp and echoed in Finish.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cookie([u8; COOKIE_SIZE]);

impl Cookie {
    /// Create a cookie from bytes.
    pub fn from_bytes(bytes: [u8; COOKIE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a cookie from a slice of exactly [`COOKIE_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Get the cookie as bytes.
    pub fn as_bytes(&self) -> &[u8; COOKIE_SIZE] {
        &self.0
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cookie({self})")
    }
}

/// Whether a Finish must come from the same IP as its Init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressBinding {
    /// Any source may complete a handshake if it presents the cookie.
    #[default]
    Advisory,
    /// Finish from a different IP is rejected and the pending entry kept.
    Strict,
}

/// Responder state between Init and Finish.
struct PendingHandshake {
    responder: KeyPair,
    initiator_public: [u8; PUBLIC_KEY_SIZE],
    source: SocketAddr,
    created_at: Instant,
}

#[derive(Default)]
struct ResponderState {
    pending: HashMap<Cookie, PendingHandshake>,
    last_init: HashMap<IpAddr, Instant>,
}

/// Handshake responder.
///
/// Shared by reference between tasks; both tables live behind one mutex and
/// every check-then-insert happens under a single acquisition.
pub struct Responder<R: RandomSource = OsRandom> {
    psk: Psk,
    /// Per-process cookie secret. Never rotated.
    cookie_key: [u8; KEY_SIZE],
    binding: AddressBinding,
    rng: R,
    state: Mutex<ResponderState>,
}

impl Responder<OsRandom> {
    /// Create a responder drawing randomness from the OS.
    ///
    /// # Errors
    /// `RandomSourceFailure` if the cookie secret cannot be generated.
    pub fn new(psk: Psk) -> Result<Self, CryptoError> {
        Self::with_rng(psk, OsRandom)
    }
}

impl<R: RandomSource> Responder<R> {
    /// Create a responder with an explicit random source.
    pub fn with_rng(psk: Psk, rng: R) -> Result<Self, CryptoError> {
        let mut cookie_key = [0u8; KEY_SIZE];
        rng.fill(&mut cookie_key)?;
        Ok(Self {
            psk,
            cookie_key,
            binding: AddressBinding::default(),
            rng,
            state: Mutex::new(ResponderState::default()),
        })
    }

    /// Set the address binding policy.
    pub fn with_address_binding(mut self, binding: AddressBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Get the address binding policy.
    pub fn address_binding(&self) -> AddressBinding {
        self.binding
    }

    /// Process a HandshakeInit packet received now.
    pub fn handle_init(
        &self,
        source: SocketAddr,
        packet: &Packet,
    ) -> Result<Packet, HandshakeError> {
        self.handle_init_at(source, packet, Instant::now())
    }

    /// Process a HandshakeInit packet received at `now`.
    ///
    /// Returns the Resp packet to send back, echoing the Init counter.
    pub fn handle_init_at(
        &self,
        source: SocketAddr,
        packet: &Packet,
        now: Instant,
    ) -> Result<Packet, HandshakeError> {
        let payload = packet.payload();
        if payload.len() < INIT_PAYLOAD_SIZE {
            return Err(HandshakeError::MalformedPayload {
                expected: INIT_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        let mut initiator_public = [0u8; PUBLIC_KEY_SIZE];
        initiator_public.copy_from_slice(&payload[..PUBLIC_KEY_SIZE]);
        let tag = &payload[PUBLIC_KEY_SIZE..INIT_PAYLOAD_SIZE];

        let expected = hmac(self.psk.as_bytes(), &initiator_public)?;
        if !constant_time_eq(&expected, tag) {
            return Err(HandshakeError::AuthenticationFailed);
        }

        let ip = source.ip().to_canonical();
        {
            let mut state = self.lock();
            if let Some(last) = state.last_init.get(&ip) {
                if now.saturating_duration_since(*last) < INIT_RATE_LIMIT_WINDOW {
                    return Err(HandshakeError::RateLimited);
                }
            }
            state.last_init.insert(ip, now);
        }

        let responder = KeyPair::generate(&self.rng)?;
        let cookie = self.cookie(ip, &initiator_public)?;

        let mut payload = Vec::with_capacity(PUBLIC_KEY_SIZE + COOKIE_SIZE);
        payload.extend_from_slice(responder.public_key());
        payload.extend_from_slice(cookie.as_bytes());

        let replaced = self
            .lock()
            .pending
            .insert(
                cookie,
                PendingHandshake {
                    responder,
                    initiator_public,
                    source,
                    created_at: now,
                },
            )
            .is_some();
        debug!(peer = %source, %cookie, replaced, "handshake init accepted");

        Ok(Packet::new(
            PacketType::HandshakeResp,
            packet.counter(),
            payload,
        ))
    }

    /// Process a HandshakeFinish packet.
    ///
    /// Consumes the pending entry and returns the derived session key. The
    /// caller installs the session for `source`.
    pub fn handle_finish(
        &self,
        source: SocketAddr,
        packet: &Packet,
    ) -> Result<SessionKey, HandshakeError> {
        let cookie = Cookie::from_slice(packet.payload()).ok_or(
            HandshakeError::MalformedPayload {
                expected: FINISH_PAYLOAD_SIZE,
                actual: packet.payload().len(),
            },
        )?;

        let pending = match self.lock().pending.entry(cookie) {
            Entry::Vacant(_) => return Err(HandshakeError::UnknownCookie),
            Entry::Occupied(entry) => {
                if self.binding == AddressBinding::Strict
                    && entry.get().source.ip().to_canonical() != source.ip().to_canonical()
                {
                    return Err(HandshakeError::AddressMismatch);
                }
                entry.remove()
            }
        };

        let key = pending
            .responder
            .derive_shared(&pending.initiator_public, &self.psk)?;
        debug!(
            peer = %source,
            init_source = %pending.source,
            %cookie,
            "handshake finished"
        );
        Ok(key)
    }

    /// Number of handshakes awaiting Finish.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Drop pending handshakes older than `ttl` and rate-limit entries that
    /// can no longer block an Init.
    ///
    /// Returns the number of pending handshakes removed.
    pub fn evict_expired(&self, now: Instant, ttl: Duration) -> usize {
        let mut state = self.lock();
        let before = state.pending.len();
        state
            .pending
            .retain(|_, p| now.saturating_duration_since(p.created_at) < ttl);
        state
            .last_init
            .retain(|_, last| now.saturating_duration_since(*last) < INIT_RATE_LIMIT_WINDOW);
        before - state.pending.len()
    }

    fn cookie(
        &self,
        ip: IpAddr,
        initiator_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<Cookie, CryptoError> {
        let tag = match ip {
            IpAddr::V4(v4) => hmac_parts(&self.cookie_key, &[&v4.octets()[..], &initiator_public[..]])?,
            IpAddr::V6(v6) => hmac_parts(&self.cookie_key, &[&v6.octets()[..], &initiator_public[..]])?,
        };
        let mut cookie = [0u8; COOKIE_SIZE];
        cookie.copy_from_slice(&tag[..COOKIE_SIZE]);
        Ok(Cookie(cookie))
    }

    fn lock(&self) -> MutexGuard<'_, ResponderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: RandomSource> fmt::Debug for Responder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("binding", &self.binding)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl<R: RandomSource> Drop for Responder<R> {
    fn drop(&mut self) {
        self.cookie_key.zeroize();
    }
}
