//! # Serial Communication Module
//!
//! Handles serial communication with the control panel device.
//!
//! This module handles:
//! - Opening the panel serial port at 115,200 baud
//! - Async read/write operations
//! - Framing outgoing packets and streaming them to the port
//! - Assembling incoming bytes into candidate packets and validating them
//! - Surfacing rejected packets to the caller without internal retries

use bytes::{BufMut, BytesMut};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Result, SimPanelError};
use crate::packet::compiler::encode_packet;
use crate::packet::protocol::{
    Packet, PacketStatus, MAX_PACKET_LENGTH, MIN_PACKET_LENGTH, PACKET_END_BYTE, PACKET_START_BYTE,
};
use crate::packet::validator::{decode_packet, validate_packet};

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

/// Default panel link baud rate
pub const PANEL_BAUD_RATE: u32 = 115_200;

/// Default panel device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (Arduino-style boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Panel Serial Port Handler
///
/// Manages the serial connection to the control panel and speaks the
/// framed packet protocol over it.
pub struct PanelSerial<P: SerialPortIO = TokioSerialPort> {
    /// Serial port handle
    port: P,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl<P: SerialPortIO> std::fmt::Debug for PanelSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl PanelSerial<TokioSerialPort> {
    /// Open a connection to the panel
    ///
    /// Auto-detects the device by trying common paths at the default baud
    /// rate.
    ///
    /// # Errors
    ///
    /// Returns error if no panel device is found or the connection fails
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, PANEL_BAUD_RATE)
    }

    /// Open a connection to the panel with custom device paths and baud rate
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Link baud rate (e.g., from `Config::serial`)
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {} at {} baud", path, baud_rate);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened panel device at {}", path);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SimPanelError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with panel link settings (8N1)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = Self::port_builder(path, baud_rate)
            .open_native_async()
            .map_err(|e| SimPanelError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Build the port configuration for a panel link (8N1, no flow control)
    fn port_builder(path: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
    }
}

impl<P: SerialPortIO> PanelSerial<P> {
    /// Wrap an already-open port
    ///
    /// Used to drive the handler over a non-default transport (and by the
    /// tests, over a mock port).
    pub fn from_port(port: P, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
        }
    }

    /// Frame a packet and send it to the panel
    ///
    /// # Errors
    ///
    /// Returns error if the write or flush fails
    pub async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        let frame = encode_packet(packet);

        self.port
            .write_all(&frame)
            .await
            .map_err(|e| SimPanelError::Serial(format!("Failed to write packet: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| SimPanelError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!(
            "Sent packet 0x{:02X} ({} bytes)",
            packet.identifier,
            frame.len()
        );
        Ok(())
    }

    /// Receive the next packet from the panel
    ///
    /// Bytes before a start marker are discarded as line noise. Once the
    /// accumulated buffer is at least the minimum packet length and ends
    /// with the marker byte, it is validated. A marker byte that turns out
    /// to sit inside the CRC field produces a length rejection on a partial
    /// buffer, in which case accumulation simply continues until the true
    /// end marker arrives.
    ///
    /// # Errors
    ///
    /// Returns error if the stream closes, a read fails, a packet fails
    /// validation, or no frame completes within the maximum packet length.
    pub async fn receive_packet(&mut self) -> Result<Packet> {
        let mut buffer = BytesMut::with_capacity(MAX_PACKET_LENGTH);

        loop {
            let byte = self
                .port
                .read_byte()
                .await
                .map_err(|e| SimPanelError::Serial(format!("Failed to read byte: {}", e)))?
                .ok_or(SimPanelError::SerialClosed)?;

            if buffer.is_empty() && byte != PACKET_START_BYTE {
                continue;
            }
            buffer.put_u8(byte);

            if buffer.len() >= MIN_PACKET_LENGTH && byte == PACKET_END_BYTE {
                match validate_packet(&buffer) {
                    PacketStatus::Valid => {
                        debug!("Received packet ({} bytes)", buffer.len());
                        return decode_packet(&buffer);
                    }
                    // The declared length says the frame is still in
                    // flight; the marker was CRC data
                    PacketStatus::LengthError if buffer.len() < MAX_PACKET_LENGTH => {}
                    status => {
                        warn!("Rejected packet ({} bytes): {}", buffer.len(), status);
                        return Err(SimPanelError::Packet(status));
                    }
                }
            }

            if buffer.len() >= MAX_PACKET_LENGTH {
                return Err(SimPanelError::Serial(format!(
                    "No complete packet within {} bytes",
                    MAX_PACKET_LENGTH
                )));
            }
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use crate::packet::protocol::PacketIdentifier;

    /// Heartbeat frame: identifier 0xFF, payload [0x01], CRC 0xF1D1
    const HEARTBEAT_FRAME: [u8; 7] = [0x7E, 0xFF, 0x01, 0x01, 0xF1, 0xD1, 0x7E];

    fn mock_serial() -> (MockSerialPort, PanelSerial<MockSerialPort>) {
        let mock = MockSerialPort::new();
        let serial = PanelSerial::from_port(mock.clone(), "/dev/mock0");
        (mock, serial)
    }

    #[test]
    fn test_constants() {
        assert_eq!(PANEL_BAUD_RATE, 115_200);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyACM0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = PanelSerial::open_with_paths(invalid_paths, PANEL_BAUD_RATE);

        assert!(result.is_err());
        match result.unwrap_err() {
            SimPanelError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = PanelSerial::open_with_paths(empty_paths, PANEL_BAUD_RATE);

        assert!(matches!(
            result.unwrap_err(),
            SimPanelError::SerialPortNotFound(_)
        ));
    }

    #[test]
    fn test_port_builder_applies_configured_baud() {
        // A baud rate from configuration must reach the port builder
        // rather than being overridden by the default
        let builder = PanelSerial::port_builder("/dev/ttyUSB1", 57_600);
        let description = format!("{:?}", builder);

        assert!(
            description.contains("57600"),
            "builder should carry the configured baud rate: {}",
            description
        );
        assert!(
            description.contains("/dev/ttyUSB1"),
            "builder should carry the requested path: {}",
            description
        );
    }

    #[test]
    fn test_port_builder_default_baud() {
        let builder = PanelSerial::port_builder("/dev/ttyACM0", PANEL_BAUD_RATE);
        let description = format!("{:?}", builder);

        assert!(description.contains("115200"), "{}", description);
    }

    #[tokio::test]
    async fn test_send_packet_writes_frame() {
        let (mock, mut serial) = mock_serial();

        let packet = Packet::with_identifier(PacketIdentifier::Heartbeat, vec![0x01]).unwrap();
        serial.send_packet(&packet).await.unwrap();

        let written = mock.get_written_data();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], HEARTBEAT_FRAME.to_vec());
    }

    #[tokio::test]
    async fn test_send_packet_write_error() {
        let (mock, mut serial) = mock_serial();
        mock.set_write_error(std::io::ErrorKind::BrokenPipe);

        let packet = Packet::with_identifier(PacketIdentifier::Heartbeat, vec![0x01]).unwrap();
        let result = serial.send_packet(&packet).await;

        assert!(matches!(result.unwrap_err(), SimPanelError::Serial(_)));
    }

    #[tokio::test]
    async fn test_send_packet_flush_error() {
        let (mock, mut serial) = mock_serial();
        mock.set_flush_error(std::io::ErrorKind::BrokenPipe);

        let packet = Packet::with_identifier(PacketIdentifier::Heartbeat, vec![0x01]).unwrap();
        let result = serial.send_packet(&packet).await;

        assert!(matches!(result.unwrap_err(), SimPanelError::Serial(_)));
    }

    #[tokio::test]
    async fn test_receive_packet() {
        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&HEARTBEAT_FRAME);

        let packet = serial.receive_packet().await.unwrap();
        assert_eq!(packet.identifier, 0xFF);
        assert_eq!(packet.payload, vec![0x01]);
    }

    #[tokio::test]
    async fn test_receive_packet_skips_leading_noise() {
        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&[0x00, 0x55, 0xAA]);
        mock.queue_read_data(&HEARTBEAT_FRAME);

        let packet = serial.receive_packet().await.unwrap();
        assert_eq!(packet.identifier, 0xFF);
    }

    #[tokio::test]
    async fn test_receive_packet_marker_in_crc_field() {
        // Payload [0x01, 0x05] has CRC 0x7E9B: the CRC high byte collides
        // with the marker, so the first end-of-frame candidate is a partial
        // buffer and accumulation must continue
        let frame = [0x7E, 0x02, 0x02, 0x01, 0x05, 0x7E, 0x9B, 0x7E];
        assert_eq!(validate_packet(&frame), PacketStatus::Valid);

        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&frame);

        let packet = serial.receive_packet().await.unwrap();
        assert_eq!(packet.identifier, 0x02);
        assert_eq!(packet.payload, vec![0x01, 0x05]);
    }

    #[tokio::test]
    async fn test_receive_packet_crc_error() {
        let mut frame = HEARTBEAT_FRAME;
        frame[4] = 0x00;
        frame[5] = 0x00;

        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&frame);

        let result = serial.receive_packet().await;
        assert!(matches!(
            result.unwrap_err(),
            SimPanelError::Packet(PacketStatus::CrcError)
        ));
    }

    #[tokio::test]
    async fn test_receive_packet_stream_closed() {
        let (_, mut serial) = mock_serial();

        let result = serial.receive_packet().await;
        assert!(matches!(result.unwrap_err(), SimPanelError::SerialClosed));
    }

    #[tokio::test]
    async fn test_receive_packet_closed_mid_frame() {
        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&HEARTBEAT_FRAME[..4]);

        let result = serial.receive_packet().await;
        assert!(matches!(result.unwrap_err(), SimPanelError::SerialClosed));
    }

    #[tokio::test]
    async fn test_receive_two_packets_back_to_back() {
        let (mock, mut serial) = mock_serial();
        mock.queue_read_data(&HEARTBEAT_FRAME);
        let second = [0x7E, 0x01, 0x00, 0xFF, 0xFF, 0x7E];
        mock.queue_read_data(&second);

        let first = serial.receive_packet().await.unwrap();
        assert_eq!(first.identifier, 0xFF);

        let next = serial.receive_packet().await.unwrap();
        assert_eq!(next.identifier, 0x01);
        assert!(next.payload.is_empty());
    }

    #[tokio::test]
    async fn test_send_receive_round_trip() {
        let (mock, mut serial) = mock_serial();

        let sent =
            Packet::with_identifier(PacketIdentifier::UpdateFreq, vec![0x00, 0x76, 0x05, 0x50])
                .unwrap();
        serial.send_packet(&sent).await.unwrap();

        // Loop the written frame back into the read side
        let written = mock.get_written_data();
        mock.queue_read_data(&written[0]);

        let received = serial.receive_packet().await.unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_device_path() {
        let (_, serial) = mock_serial();
        assert_eq!(serial.device_path(), "/dev/mock0");
    }
}
