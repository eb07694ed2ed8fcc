//! # Error Types
//!
//! Custom error types for SimPanel Bridge using `thiserror`.

use thiserror::Error;

use crate::packet::protocol::PacketStatus;

/// Main error type for SimPanel Bridge
#[derive(Debug, Error)]
pub enum SimPanelError {
    /// A packet was rejected by validation or compilation
    #[error("packet rejected: {0}")]
    Packet(PacketStatus),

    /// No panel device could be opened
    #[error("no panel device found at: {0}")]
    SerialPortNotFound(String),

    /// Serial port errors
    #[error("serial error: {0}")]
    Serial(String),

    /// The serial stream reached end of input
    #[error("serial stream closed")]
    SerialClosed,

    /// A valid packet arrived with no registered process for it
    #[error("no process registered for packet identifier 0x{0:02X}")]
    UnhandledPacket(u8),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for SimPanel Bridge
pub type Result<T> = std::result::Result<T, SimPanelError>;
