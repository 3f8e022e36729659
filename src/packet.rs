//! Wire format of a single rcon packet.
//!
//! ```text
//! [i32 size][i32 id][i32 type][body ...][0x00][0x00]
//! ```
//!
//! All integers are little-endian. `size` counts every byte after itself.
use std::borrow::Cow;

use crate::error::{RconError, Result};

/// Bodies of exactly this many bytes mean the server split its response and
/// more fragments are on the way.
pub const FRAGMENT_SIZE: usize = 4096;

/// Smallest possible value of the size field: id, type and two terminators.
pub const MIN_PACKET_LENGTH: usize = 10;

/// Largest body we send or accept.
pub const MAX_BODY_LENGTH: usize = 1024 * 1024;

/// Largest size field we are willing to allocate for.
pub const MAX_PACKET_LENGTH: usize = MAX_BODY_LENGTH + MIN_PACKET_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

impl PacketType {
    pub fn code(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.code().to_le_bytes()
    }
}

/// A single packet, either one we are about to send or one we just read.
///
/// The type is kept as the raw code because the protocol reuses `2` for both
/// exec requests and auth responses; interpreting it is up to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: i32,
    body: Vec<u8>,
}

impl Packet {
    pub fn new(id: i32, packet_type: PacketType, body: &str) -> Self {
        Packet {
            id,
            packet_type: packet_type.code(),
            body: body.as_bytes().to_vec(),
        }
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    // Sessions never build bodies over MAX_BODY_LENGTH; anything bigger saturates.
    pub fn size(&self) -> i32 {
        i32::try_from(self.body.len() + MIN_PACKET_LENGTH).unwrap_or(i32::MAX)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> i32 {
        self.packet_type
    }

    pub fn is(&self, packet_type: PacketType) -> bool {
        self.packet_type == packet_type.code()
    }

    /// Body text. Invalid UTF-8 is replaced rather than rejected.
    pub fn body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::<u8>::with_capacity(4 + self.size() as usize);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(&self.body);
        // null terminate the body (C++ interop 🤢), then null terminate the entire package
        payload.extend_from_slice(&[0u8, 0u8]);
        payload
    }

    /// Parses the 4-byte size prefix and returns how many bytes follow it.
    pub fn decode_length(header: [u8; 4]) -> Result<usize> {
        let size = i32::from_le_bytes(header);
        match usize::try_from(size) {
            Ok(len) if (MIN_PACKET_LENGTH..=MAX_PACKET_LENGTH).contains(&len) => Ok(len),
            _ => Err(RconError::ProtocolError(format!("invalid packet size {}", size))),
        }
    }

    /// Unpacks everything after the size prefix: id, type, body and the two
    /// trailing terminators, which are dropped.
    pub fn unpack(frame: &[u8]) -> Result<Self> {
        if frame.len() < MIN_PACKET_LENGTH {
            return Err(RconError::ProtocolError(format!(
                "packet too short: {} bytes",
                frame.len()
            )));
        }

        let id = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let packet_type = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
        let body = frame[8..frame.len() - 2].to_vec();

        Ok(Packet {
            id,
            packet_type,
            body,
        })
    }
}

/// The continuation heuristic: srcds never tells us how many packets a
/// response spans, but it splits at exactly [FRAGMENT_SIZE] bytes, so anything
/// shorter has to be the tail.
pub fn is_final_fragment(body_len: usize) -> bool {
    body_len < FRAGMENT_SIZE
}
