//! Client side of the handshake.
//!
//! [`Initiator`] holds the ephemeral key pair for one attempt and turns the
//! responder's Resp into a Finish plus the session key. It performs no I/O;
//! the client bootstrap drives it over a socket.
//!
//! The initiator never verifies a tag from the responder. Trust rests on the
//! PSK-authenticated Init and on the PSK being the HKDF salt: a peer without
//! the PSK can answer with its own ephemeral key but cannot derive the key.

use crate::core::{
    COOKIE_SIZE, CryptoError, HandshakeError, PUBLIC_KEY_SIZE, RESP_PAYLOAD_SIZE, RandomSource,
};
use crate::crypto::{KeyPair, OsRandom, Psk, SessionKey, hmac};
use crate::wire::{Packet, PacketType};

/// One handshake attempt in progress.
#[derive(Debug)]
pub struct Initiator<'a> {
    keypair: KeyPair,
    psk: &'a Psk,
    counter: u64,
}

impl<'a> Initiator<'a> {
    /// Start an attempt with a fresh OS-random ephemeral key.
    pub fn new(psk: &'a Psk, counter: u64) -> Result<Self, CryptoError> {
        Self::with_rng(psk, counter, &OsRandom)
    }

    /// Start an attempt drawing the ephemeral key from `rng`.
    pub fn with_rng<R: RandomSource + ?Sized>(
        psk: &'a Psk,
        counter: u64,
        rng: &R,
    ) -> Result<Self, CryptoError> {
        Ok(Self::from_keypair(KeyPair::generate(rng)?, psk, counter))
    }

    /// Start an attempt with a caller-supplied key pair.
    pub fn from_keypair(keypair: KeyPair, psk: &'a Psk, counter: u64) -> Self {
        Self {
            keypair,
            psk,
            counter,
        }
    }

    /// The ephemeral public key sent in Init.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.keypair.public_key()
    }

    /// Counter carried by Init and expected back in Resp.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Build the Init packet: `public key || HMAC(psk, public key)`.
    pub fn init_packet(&self) -> Result<Packet, CryptoError> {
        let public = self.keypair.public_key();
        let mut payload = Vec::with_capacity(PUBLIC_KEY_SIZE * 2);
        payload.extend_from_slice(public);
        payload.extend_from_slice(&hmac(self.psk.as_bytes(), public)?);
        Ok(Packet::new(PacketType::HandshakeInit, self.counter, payload))
    }

    /// Check whether `packet` is the Resp to this attempt's Init.
    pub fn is_response(&self, packet: &Packet) -> bool {
        packet.packet_type() == Some(PacketType::HandshakeResp) && packet.counter() == self.counter
    }

    /// Consume a Resp, returning the Finish packet and the session key.
    ///
    /// The ephemeral private key is dropped (and zeroized) whatever the
    /// outcome.
    pub fn finish(self, resp: &Packet) -> Result<(Packet, SessionKey), HandshakeError> {
        let payload = resp.payload();
        if payload.len() < RESP_PAYLOAD_SIZE {
            return Err(HandshakeError::MalformedPayload {
                expected: RESP_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        let mut responder_public = [0u8; PUBLIC_KEY_SIZE];
        responder_public.copy_from_slice(&payload[..PUBLIC_KEY_SIZE]);
        let cookie = &payload[PUBLIC_KEY_SIZE..];
        debug_assert!(cookie.len() >= COOKIE_SIZE);

        let key = self.keypair.derive_shared(&responder_public, self.psk)?;
        let finish = Packet::new(PacketType::HandshakeFinish, self.counter, cookie.to_vec());
        Ok((finish, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_shared;
    use crate::handshake::Responder;
    use std::net::SocketAddr;

    fn peer() -> SocketAddr {
        "10.0.0.1:1234".parse().unwrap()
    }

    #[test]
    fn test_init_packet_shape() {
        let psk = Psk::from("psk");
        let initiator = Initiator::new(&psk, 7).unwrap();
        let init = initiator.init_packet().unwrap();

        assert_eq!(init.packet_type(), Some(PacketType::HandshakeInit));
        assert_eq!(init.counter(), 7);
        assert_eq!(init.payload().len(), 64);
        assert_eq!(&init.payload()[..32], initiator.public_key());
        assert_eq!(
            init.payload()[32..],
            hmac(b"psk", initiator.public_key()).unwrap()[..]
        );
    }

    #[test]
    fn test_full_exchange_agrees() {
        let psk = Psk::from("correct horse battery staple");
        let responder = Responder::new(psk.clone()).unwrap();
        let initiator = Initiator::new(&psk, 1).unwrap();

        let resp = responder.handle_init(peer(), &initiator.init_packet().unwrap()).unwrap();
        assert!(initiator.is_response(&resp));

        let (finish, client_key) = initiator.finish(&resp).unwrap();
        assert_eq!(finish.packet_type(), Some(PacketType::HandshakeFinish));
        assert_eq!(finish.payload().len(), COOKIE_SIZE);

        let server_key = responder.handle_finish(peer(), &finish).unwrap();
        assert_eq!(client_key.as_bytes(), server_key.as_bytes());
    }

    #[test]
    fn test_many_exchanges_agree() {
        let psk = Psk::from("psk");
        let responder = Responder::new(psk.clone()).unwrap();
        for i in 0..16u8 {
            let source: SocketAddr = format!("10.0.1.{i}:4000").parse().unwrap();
            let initiator = Initiator::new(&psk, u64::from(i)).unwrap();
            let resp = responder.handle_init(source, &initiator.init_packet().unwrap()).unwrap();
            let (finish, client_key) = initiator.finish(&resp).unwrap();
            let server_key = responder.handle_finish(source, &finish).unwrap();
            assert_eq!(client_key.as_bytes(), server_key.as_bytes());
        }
    }

    #[test]
    fn test_psk_mismatch_rejected_by_responder() {
        let responder = Responder::new(Psk::from("server psk")).unwrap();
        let client_psk = Psk::from("client psk");
        let initiator = Initiator::new(&client_psk, 1).unwrap();

        assert!(matches!(
            responder.handle_init(peer(), &initiator.init_packet().unwrap()),
            Err(HandshakeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_concrete_scenario_key() {
        let psk = Psk::from("psk");
        let mut private = [0u8; 32];
        for (i, b) in private.iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        let initiator = Initiator::from_keypair(KeyPair::from_private(private), &psk, 1);
        let responder_kp = KeyPair::from_private([0x55; 32]);

        let mut payload = responder_kp.public_key().to_vec();
        payload.extend_from_slice(&[0xC0; COOKIE_SIZE]);
        let resp = Packet::new(PacketType::HandshakeResp, 1, payload);

        let (finish, key) = initiator.finish(&resp).unwrap();
        assert_eq!(finish.payload(), &[0xC0; COOKIE_SIZE]);

        let expected = derive_shared(
            responder_kp.private_key(),
            KeyPair::from_private(private).public_key(),
            &psk,
        )
        .unwrap();
        assert_eq!(key.as_bytes(), expected.as_bytes());
    }

    #[test]
    fn test_short_resp_rejected() {
        let psk = Psk::from("psk");
        let initiator = Initiator::new(&psk, 1).unwrap();
        let resp = Packet::new(PacketType::HandshakeResp, 1, vec![1u8; 40]);
        assert!(matches!(
            initiator.finish(&resp),
            Err(HandshakeError::MalformedPayload {
                expected: 48,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_is_response_checks_type_and_counter() {
        let psk = Psk::from("psk");
        let initiator = Initiator::new(&psk, 9).unwrap();
        let payload = vec![0u8; 48];

        assert!(initiator.is_response(&Packet::new(PacketType::HandshakeResp, 9, payload.clone())));
        assert!(!initiator.is_response(&Packet::new(PacketType::HandshakeResp, 8, payload.clone())));
        assert!(!initiator.is_response(&Packet::new(PacketType::Rekey, 9, payload)));
    }

    #[test]
    fn test_low_order_responder_key_rejected() {
        let psk = Psk::from("psk");
        let initiator = Initiator::new(&psk, 1).unwrap();
        let resp = Packet::new(PacketType::HandshakeResp, 1, vec![0u8; 48]);
        assert!(matches!(
            initiator.finish(&resp),
            Err(HandshakeError::Crypto(CryptoError::KeyAgreementFailed))
        ));
    }
}
