//! # Packet Compiler
//!
//! Serializes a command identifier and payload into the exact wire format
//! accepted by the validator.

use super::crc::crc16_ccitt;
use super::protocol::{
    packet_total_length, Packet, PacketStatus, MAX_PAYLOAD_LENGTH, PACKET_END_BYTE,
    PACKET_IDENTIFIER_LOC, PACKET_LENGTH_LOC, PACKET_PAYLOAD_START_LOC, PACKET_START_BYTE,
};

/// Compile a packet into a caller-owned output buffer
///
/// Writes start marker, identifier, length byte, the payload verbatim, the
/// big-endian CRC-16 over the payload, and the end marker. Precondition
/// failures are reported before any byte is written, so the buffer is never
/// left partially filled.
///
/// The payload is not re-scanned for marker bytes here; producers are
/// expected to construct payloads through [`Packet::new`], which enforces
/// that rule. A marker smuggled past it still fails validation on the
/// receiving side.
///
/// # Arguments
///
/// * `packet_buf` - Output buffer, capacity at least `packet_total_length(payload.len())`
/// * `payload` - Payload bytes to frame
/// * `identifier` - Command identifier byte
///
/// # Returns
///
/// * `PacketStatus::Valid` - Packet written
/// * `PacketStatus::SchemaError` - Identifier equals the reserved marker
/// * `PacketStatus::UnknownError` - Oversize payload or undersized buffer
pub fn compile_packet(packet_buf: &mut [u8], payload: &[u8], identifier: u8) -> PacketStatus {
    if identifier == PACKET_START_BYTE {
        return PacketStatus::SchemaError;
    }

    if payload.len() > MAX_PAYLOAD_LENGTH {
        return PacketStatus::UnknownError;
    }

    let total_length = packet_total_length(payload.len());
    if packet_buf.len() < total_length {
        return PacketStatus::UnknownError;
    }

    packet_buf[0] = PACKET_START_BYTE;
    packet_buf[PACKET_IDENTIFIER_LOC] = identifier;
    packet_buf[PACKET_LENGTH_LOC] = payload.len() as u8;
    packet_buf[PACKET_PAYLOAD_START_LOC..PACKET_PAYLOAD_START_LOC + payload.len()]
        .copy_from_slice(payload);

    let crc = crc16_ccitt(payload);
    let crc_loc = PACKET_PAYLOAD_START_LOC + payload.len();
    packet_buf[crc_loc..crc_loc + 2].copy_from_slice(&crc.to_be_bytes());
    packet_buf[total_length - 1] = PACKET_END_BYTE;

    PacketStatus::Valid
}

/// Encode a [`Packet`] into a freshly allocated wire buffer
///
/// `Packet::new` has already enforced the framing rules, so this cannot
/// fail.
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut buffer = vec![0u8; packet.wire_length()];

    let status = compile_packet(&mut buffer, &packet.payload, packet.identifier);
    debug_assert_eq!(status, PacketStatus::Valid);

    buffer
}
