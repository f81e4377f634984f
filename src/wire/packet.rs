//! Packet encoding and decoding.
//!
//! Every XIU datagram has the same shape:
//!
//! ```text
//! +--------+------------------+-------------------+
//! | type   | counter (BE u64) | payload           |
//! | 1 byte | 8 bytes          | remaining bytes   |
//! +--------+------------------+-------------------+
//! ```
//!
//! The codec does not interpret the type byte; callers convert it with
//! [`PacketType::from_byte`] and drop what they do not understand.

use crate::core::{HEADER_SIZE, WireError};

/// Packet type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Initiator public key and PSK tag.
    HandshakeInit = 0x01,
    /// Responder public key and cookie.
    HandshakeResp = 0x02,
    /// Cookie echo completing the handshake.
    HandshakeFinish = 0x03,
    /// Tunnel payload (not carried by this implementation).
    Data = 0x04,
    /// Liveness ping from the client.
    Keepalive = 0x05,
    /// Request for the client to run a fresh handshake.
    Rekey = 0x06,
}

impl PacketType {
    /// Parse packet type from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::HandshakeInit),
            0x02 => Some(Self::HandshakeResp),
            0x03 => Some(Self::HandshakeFinish),
            0x04 => Some(Self::Data),
            0x05 => Some(Self::Keepalive),
            0x06 => Some(Self::Rekey),
            _ => None,
        }
    }

    /// Convert packet type to its byte representation.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> u8 {
        t.as_byte()
    }
}

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: u8,
    counter: u64,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a packet of a known type.
    pub fn new(packet_type: PacketType, counter: u64, payload: Vec<u8>) -> Self {
        Self::from_raw(packet_type.as_byte(), counter, payload)
    }

    /// Create a packet with an arbitrary type byte.
    pub fn from_raw(packet_type: u8, counter: u64, payload: Vec<u8>) -> Self {
        Self {
            packet_type,
            counter,
            payload,
        }
    }

    /// The raw type byte as it appeared on the wire.
    pub fn type_byte(&self) -> u8 {
        self.packet_type
    }

    /// The decoded packet type, or `None` for unknown values.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_byte(self.packet_type)
    }

    /// The counter field.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize to wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.push(self.packet_type);
        buf.extend_from_slice(&self.counter.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse from wire format.
    ///
    /// Any input of at least [`HEADER_SIZE`] bytes decodes; the payload is
    /// whatever follows the header, possibly empty.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < HEADER_SIZE {
            return Err(WireError::ShortPacket { len: data.len() });
        }

        let mut counter = [0u8; 8];
        counter.copy_from_slice(&data[1..HEADER_SIZE]);

        Ok(Self {
            packet_type: data[0],
            counter: u64::from_be_bytes(counter),
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_roundtrip() {
        for t in [
            PacketType::HandshakeInit,
            PacketType::HandshakeResp,
            PacketType::HandshakeFinish,
            PacketType::Data,
            PacketType::Keepalive,
            PacketType::Rekey,
        ] {
            assert_eq!(PacketType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(PacketType::from_byte(0x00), None);
        assert_eq!(PacketType::from_byte(0x07), None);
        assert_eq!(PacketType::from_byte(0xFF), None);
    }

    #[test]
    fn test_encode_layout() {
        let packet = Packet::new(PacketType::HandshakeResp, 0x0102030405060708, vec![0xAA, 0xBB]);
        let bytes = packet.encode();
        assert_eq!(
            bytes,
            hex::decode("020102030405060708aabb").unwrap()
        );
    }

    #[test]
    fn test_roundtrip() {
        let cases = [
            Packet::new(PacketType::HandshakeInit, 0, vec![7u8; 64]),
            Packet::new(PacketType::Keepalive, u64::MAX, Vec::new()),
            Packet::from_raw(0xEE, 42, b"unknown type".to_vec()),
        ];
        for packet in cases {
            let decoded = Packet::decode(&packet.encode()).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_short_input_rejected() {
        for len in 0..HEADER_SIZE {
            let data = vec![0x01; len];
            assert_eq!(
                Packet::decode(&data),
                Err(WireError::ShortPacket { len })
            );
        }
    }

    #[test]
    fn test_header_only_has_empty_payload() {
        let data = [0x05, 0, 0, 0, 0, 0, 0, 0, 9];
        let packet = Packet::decode(&data).unwrap();
        assert_eq!(packet.packet_type(), Some(PacketType::Keepalive));
        assert_eq!(packet.counter(), 9);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_unknown_type_decodes() {
        let packet = Packet::decode(&[0x7F, 0, 0, 0, 0, 0, 0, 0, 1, 0xAB]).unwrap();
        assert_eq!(packet.type_byte(), 0x7F);
        assert_eq!(packet.packet_type(), None);
        assert_eq!(packet.payload(), &[0xAB]);
    }
}
