//! # CRC-16/CCITT-FALSE Implementation
//!
//! CRC-16 checksum calculation for the panel packet protocol.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0xFFFF, no output XOR, no reflection

/// CRC-16/CCITT polynomial
const CRC16_POLY: u16 = 0x1021;

/// CRC-16 initial register value
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-16/CCITT-FALSE checksum using the lookup table (fast)
///
/// Empty input yields the initial register value `0xFFFF`. Both the
/// validator and the compiler use this same routine, so a compiled packet
/// always re-validates.
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (payload bytes only)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        let index = ((crc >> 8) ^ byte as u16) as usize;
        crc = (crc << 8) ^ CRC16_TABLE[index];
    }

    crc
}

/// Calculate the CRC-16 checksum using the direct algorithm (slow, for verification)
///
/// XOR each byte into the high byte of the register, then shift eight
/// times, applying the polynomial when the top bit is set. Used to verify
/// the lookup table implementation in tests.
#[allow(dead_code)]
fn crc16_ccitt_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
