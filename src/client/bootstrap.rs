//! Client bootstrap and key exchange.
//!
//! Drives one [`Initiator`] over a [`TunnelSocket`]:
//! - send Init to the server
//! - wait for the matching Resp until a hard deadline
//! - derive the session key and send Finish
//!
//! There is no retry inside one call; the caller decides whether to try
//! again.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::core::{HandshakeError, RandomSource};
use crate::crypto::{OsRandom, Psk, SessionKey};
use crate::handshake::Initiator;
use crate::transport::TunnelSocket;
use crate::wire::Packet;

/// Run a full handshake with `server`, returning the session key.
///
/// # Errors
/// - `Timeout` if no matching Resp arrives within `timeout`
/// - `Wire` if a datagram from the server cannot be decoded
/// - `MalformedPayload` if the Resp payload is shorter than 48 bytes
/// - `Crypto`/`Io` on key generation or socket failure
pub async fn perform_handshake(
    socket: &mut TunnelSocket,
    server: SocketAddr,
    psk: &Psk,
    counter: u64,
    timeout: Duration,
) -> Result<SessionKey, HandshakeError> {
    perform_handshake_with_rng(socket, server, psk, counter, timeout, &OsRandom).await
}

/// [`perform_handshake`] drawing the ephemeral key from `rng`.
pub async fn perform_handshake_with_rng<R: RandomSource + ?Sized>(
    socket: &mut TunnelSocket,
    server: SocketAddr,
    psk: &Psk,
    counter: u64,
    timeout: Duration,
    rng: &R,
) -> Result<SessionKey, HandshakeError> {
    let initiator = Initiator::with_rng(psk, counter, rng)?;
    let deadline = Instant::now() + timeout;

    socket
        .send_to(&initiator.init_packet()?.encode(), server)
        .await?;
    debug!(%server, counter, "sent handshake init");

    let resp = loop {
        let (data, from) = match socket.recv_from_deadline(deadline).await {
            Ok(received) => received,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(HandshakeError::Timeout);
            }
            Err(e) => return Err(e.into()),
        };
        if from != server {
            trace!(%from, "ignoring datagram from unexpected source");
            continue;
        }

        let packet = Packet::decode(data)?;
        if initiator.is_response(&packet) {
            break packet;
        }
        trace!(
            packet_type = packet.type_byte(),
            counter = packet.counter(),
            "ignoring packet while awaiting response"
        );
    };

    let (finish, key) = initiator.finish(&resp)?;
    socket.send_to(&finish.encode(), server).await?;
    debug!(%server, fingerprint = %key.fingerprint(), "sent handshake finish");

    Ok(key)
}
