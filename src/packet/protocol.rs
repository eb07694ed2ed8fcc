//! # Panel Protocol Constants and Types
//!
//! Core definitions for the CAN-inspired framed packet protocol spoken by
//! the control panel firmware.
//!
//! Wire layout of one packet:
//!
//! ```text
//! | start (0x7E) | identifier | length | payload × length | crc16 (BE) | end (0x7E) |
//! ```
//!
//! The start and end markers share the same byte value, and the protocol
//! carries no escaping. That value must therefore never appear in the
//! identifier or the payload; the validator rejects any frame where it does.

use std::fmt;

use crate::error::{Result, SimPanelError};

/// Packet start marker (shared with the end marker)
pub const PACKET_START_BYTE: u8 = 0x7E;

/// Packet end marker (same reserved value as the start marker)
pub const PACKET_END_BYTE: u8 = 0x7E;

/// Minimum valid packet length (zero-length payload):
/// start(1) + identifier(1) + length(1) + crc(2) + end(1)
pub const MIN_PACKET_LENGTH: usize = 6;

/// Header size: start + identifier + length
pub const HEADER_SIZE: usize = 3;

/// CRC field size in bytes
pub const CRC_LENGTH: usize = 2;

/// Footer size: end marker
pub const FOOTER_SIZE: usize = 1;

/// Maximum payload size (length field is a single byte)
pub const MAX_PAYLOAD_LENGTH: usize = 255;

/// Maximum packet size on the wire
pub const MAX_PACKET_LENGTH: usize = HEADER_SIZE + MAX_PAYLOAD_LENGTH + CRC_LENGTH + FOOTER_SIZE;

/// Byte offset of the identifier field
pub const PACKET_IDENTIFIER_LOC: usize = 1;

/// Byte offset of the payload length field
pub const PACKET_LENGTH_LOC: usize = 2;

/// Byte offset of the first payload byte
pub const PACKET_PAYLOAD_START_LOC: usize = 3;

/// Total wire length of a packet carrying `payload_length` payload bytes
pub const fn packet_total_length(payload_length: usize) -> usize {
    HEADER_SIZE + payload_length + CRC_LENGTH + FOOTER_SIZE
}

/// Outcome of packet validation or compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    /// Packet is well-formed and its CRC matches
    Valid,

    /// A fixed-position byte (start, identifier, end) violates its
    /// positional constraint, or the buffer is shorter than the minimum
    /// packet size
    SchemaError,

    /// The declared payload length overruns the buffer, or a payload byte
    /// equals the reserved marker value
    LengthError,

    /// Computed and received CRC differ
    CrcError,

    /// Invalid caller precondition (output buffer too small, oversize
    /// payload)
    UnknownError,
}

impl PacketStatus {
    /// True only for [`PacketStatus::Valid`]
    pub fn is_valid(self) -> bool {
        self == PacketStatus::Valid
    }
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketStatus::Valid => "valid",
            PacketStatus::SchemaError => "schema error",
            PacketStatus::LengthError => "length error",
            PacketStatus::CrcError => "crc error",
            PacketStatus::UnknownError => "unknown error",
        };
        f.write_str(name)
    }
}

/// Command identifiers understood by the panel firmware
///
/// The protocol core treats the identifier as an opaque byte; these names
/// belong to the application layer on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketIdentifier {
    /// Radio frequency update (active/standby values)
    UpdateFreq = 0x01,

    /// Rotary encoder adjustment report
    EncoderAdj = 0x02,

    /// Frequency swap button state change
    SwapButtonState = 0x03,

    /// Rotary selector switch position report
    RotarySwitchState = 0x04,

    /// Panel LED toggle request
    LedToggle = 0x05,

    /// Request retransmission of the last packet
    Resend = 0xFE,

    /// Link heartbeat
    Heartbeat = 0xFF,
}

impl PacketIdentifier {
    /// Map a wire byte to a known identifier, if any
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::UpdateFreq),
            0x02 => Some(Self::EncoderAdj),
            0x03 => Some(Self::SwapButtonState),
            0x04 => Some(Self::RotarySwitchState),
            0x05 => Some(Self::LedToggle),
            0xFE => Some(Self::Resend),
            0xFF => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

impl From<PacketIdentifier> for u8 {
    fn from(identifier: PacketIdentifier) -> u8 {
        identifier as u8
    }
}

/// One decoded (or to-be-sent) panel packet
///
/// An owned identifier + payload pair, detached from any wire buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command identifier byte
    pub identifier: u8,

    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a new packet, enforcing the producer-side framing rules
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier equals the reserved marker byte,
    /// the payload exceeds [`MAX_PAYLOAD_LENGTH`], or any payload byte
    /// equals the marker (the protocol has no escaping, so such a payload
    /// can never be framed).
    pub fn new(identifier: u8, payload: Vec<u8>) -> Result<Self> {
        if identifier == PACKET_START_BYTE {
            return Err(SimPanelError::Packet(PacketStatus::SchemaError));
        }

        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(SimPanelError::Packet(PacketStatus::UnknownError));
        }

        if payload.contains(&PACKET_START_BYTE) {
            return Err(SimPanelError::Packet(PacketStatus::LengthError));
        }

        Ok(Self {
            identifier,
            payload,
        })
    }

    /// Convenience constructor taking a known identifier
    pub fn with_identifier(identifier: PacketIdentifier, payload: Vec<u8>) -> Result<Self> {
        Self::new(identifier.into(), payload)
    }

    /// Total wire length of this packet once framed
    pub fn wire_length(&self) -> usize {
        packet_total_length(self.payload.len())
    }
}
