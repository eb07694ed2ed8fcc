//! # Packet Validator
//!
//! Recognizes one complete, well-formed panel packet inside a raw byte
//! buffer.
//!
//! Validation walks the buffer with a fixed-order state machine: start
//! marker, identifier, declared length (with a bounds check before any
//! payload read), payload scan for stray markers, big-endian CRC-16
//! comparison, end marker. Every read is bounded by the slice length, so
//! truncated or hostile input can never cause an out-of-bounds access.

use super::crc::crc16_ccitt;
use super::protocol::{
    packet_total_length, Packet, PacketStatus, CRC_LENGTH, MIN_PACKET_LENGTH, PACKET_END_BYTE,
    PACKET_IDENTIFIER_LOC, PACKET_LENGTH_LOC, PACKET_PAYLOAD_START_LOC, PACKET_START_BYTE,
};
use crate::error::{Result, SimPanelError};

/// Validation state, advanced strictly in order; no state is revisited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidatorState {
    StartByte,
    CommandByte,
    LengthByte,
    PayloadBytes,
    CrcBytes,
    EndByte,
}

/// Check whether `packet` holds exactly one well-formed frame
///
/// Pure and idempotent: repeated calls on unchanged bytes return the same
/// status. Bytes past the end marker are not examined.
///
/// # Arguments
///
/// * `packet` - Candidate packet bytes, starting at the expected start marker
///
/// # Returns
///
/// * `PacketStatus` - [`PacketStatus::Valid`] or the specific rejection kind
pub fn validate_packet(packet: &[u8]) -> PacketStatus {
    if packet.len() < MIN_PACKET_LENGTH {
        return PacketStatus::SchemaError;
    }

    let mut cursor = 0;
    let mut payload_length = 0;
    let mut state = ValidatorState::StartByte;

    while cursor < packet.len() {
        match state {
            ValidatorState::StartByte => {
                if packet[cursor] != PACKET_START_BYTE {
                    return PacketStatus::SchemaError;
                }
                cursor += 1;
                state = ValidatorState::CommandByte;
            }

            ValidatorState::CommandByte => {
                // A marker here would be ambiguous with the start/end bytes
                if packet[cursor] == PACKET_START_BYTE {
                    return PacketStatus::SchemaError;
                }
                cursor += 1;
                state = ValidatorState::LengthByte;
            }

            ValidatorState::LengthByte => {
                payload_length = packet[cursor] as usize;

                // Bounds check before any payload read: the declared length
                // must leave room for the CRC and the end marker
                if packet_total_length(payload_length) > packet.len() {
                    return PacketStatus::LengthError;
                }
                cursor += 1;
                state = ValidatorState::PayloadBytes;
            }

            ValidatorState::PayloadBytes => {
                let payload = &packet[cursor..cursor + payload_length];
                if payload.contains(&PACKET_START_BYTE) {
                    return PacketStatus::LengthError;
                }
                cursor += payload_length;
                state = ValidatorState::CrcBytes;
            }

            ValidatorState::CrcBytes => {
                let received_crc = u16::from_be_bytes([packet[cursor], packet[cursor + 1]]);
                let calculated_crc = crc16_ccitt(
                    &packet[PACKET_PAYLOAD_START_LOC..PACKET_PAYLOAD_START_LOC + payload_length],
                );

                if calculated_crc != received_crc {
                    return PacketStatus::CrcError;
                }
                cursor += CRC_LENGTH;
                state = ValidatorState::EndByte;
            }

            ValidatorState::EndByte => {
                if packet[cursor] != PACKET_END_BYTE {
                    return PacketStatus::SchemaError;
                }
                return PacketStatus::Valid;
            }
        }
    }

    // Only reachable if the loop ran out of bytes mid-frame
    PacketStatus::SchemaError
}

/// Validate a buffer and lift its contents into an owned [`Packet`]
///
/// # Errors
///
/// Returns [`SimPanelError::Packet`] carrying the rejection status when the
/// buffer does not hold a valid frame.
pub fn decode_packet(packet: &[u8]) -> Result<Packet> {
    let status = validate_packet(packet);
    if !status.is_valid() {
        return Err(SimPanelError::Packet(status));
    }

    let payload_length = packet[PACKET_LENGTH_LOC] as usize;
    let payload =
        packet[PACKET_PAYLOAD_START_LOC..PACKET_PAYLOAD_START_LOC + payload_length].to_vec();

    Packet::new(packet[PACKET_IDENTIFIER_LOC], payload)
}
