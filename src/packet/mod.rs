//! # Panel Packet Protocol Module
//!
//! Implementation of the framed packet protocol spoken between the host
//! and the control panel firmware.
//!
//! This module handles:
//! - Frame validation via a fixed-order state machine
//! - Frame compilation into the same wire format
//! - CRC-16/CCITT-FALSE checksum calculation
//! - Framing constants and the packet status/identifier types

pub mod compiler;
pub mod crc;
pub mod protocol;
pub mod validator;
