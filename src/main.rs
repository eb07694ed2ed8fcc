//! # SimPanel Bridge
//!
//! Bridge a flight-simulator radio control panel to the host over a serial
//! link.
//!
//! This binary opens the panel's serial port, sends periodic heartbeat
//! packets so the firmware knows the host is alive, and routes every
//! incoming validated packet to the process registered for its command
//! identifier.

use std::future::Future;

use anyhow::Result;
use tokio::time::{sleep, sleep_until, timeout, Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber;

mod config;
mod dispatch;
mod error;
mod packet;
mod serial;

use config::Config;
use dispatch::{PacketProcess, ProcessRegistry};
use error::SimPanelError;
use packet::protocol::{Packet, PacketIdentifier};
use serial::{PanelSerial, TokioSerialPort};

/// Default configuration file path
const CONFIG_PATH: &str = "config/simpanel.toml";

/// Process that logs frequency updates reported by the panel
struct FreqUpdateProcess;

impl PacketProcess for FreqUpdateProcess {
    fn name(&self) -> &str {
        "freq-update"
    }

    fn process_packet(&mut self, payload: &[u8]) -> error::Result<()> {
        info!("Frequency update from panel: {:02X?}", payload);
        Ok(())
    }
}

/// Process that logs rotary selector position reports
struct RotarySwitchProcess;

impl PacketProcess for RotarySwitchProcess {
    fn name(&self) -> &str {
        "rotary-switch"
    }

    fn process_packet(&mut self, payload: &[u8]) -> error::Result<()> {
        info!("Rotary switch position: {:02X?}", payload);
        Ok(())
    }
}

/// How long a single receive attempt may block: the time remaining until
/// the next heartbeat is due, capped by the serial timeout
fn receive_window(now: Instant, next_beat: Instant, cap: Duration) -> Duration {
    next_beat.saturating_duration_since(now).min(cap)
}

/// Reopen the panel port, retrying at the configured reconnect interval
///
/// Returns `None` when the shutdown signal fires while waiting.
async fn reconnect<F>(config: &Config, shutdown: &mut F) -> Option<PanelSerial<TokioSerialPort>>
where
    F: Future<Output = std::io::Result<()>> + Unpin,
{
    let retry_interval = Duration::from_millis(config.serial.reconnect_interval_ms);

    loop {
        tokio::select! {
            _ = &mut *shutdown => return None,
            _ = sleep(retry_interval) => {}
        }

        match PanelSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)
        {
            Ok(panel) => {
                info!("Reconnected to panel at {}", panel.device_path());
                return Some(panel);
            }
            Err(e) => warn!("Reconnect failed: {}", e),
        }
    }
}

/// Main entry point for SimPanel Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (defaults when no file is present)
///    - Open serial connection to the panel at the configured baud rate
///    - Register packet processes
///
/// 2. **Main Loop**
///    - Send heartbeat packets at the configured interval
///    - Drain, validate, and dispatch incoming packets until the next
///      beat is due
///    - Reopen the port at the reconnect interval when the link drops
///    - Handle Ctrl+C for graceful shutdown at every await point
///
/// # Errors
///
/// Returns error if the serial port cannot be opened or the configuration
/// file is invalid.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("SimPanel Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(CONFIG_PATH)?;

    // Initialize serial communication
    let mut panel =
        PanelSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)
            .or_else(|_| PanelSerial::open())?;
    info!("Panel serial port opened at: {}", panel.device_path());

    // Register packet processes
    let mut registry = ProcessRegistry::new();
    registry.register(PacketIdentifier::UpdateFreq, Box::new(FreqUpdateProcess));
    registry.register(
        PacketIdentifier::RotarySwitchState,
        Box::new(RotarySwitchProcess),
    );

    let heartbeat = Packet::with_identifier(PacketIdentifier::Heartbeat, vec![0x01])
        .map_err(|e| anyhow::anyhow!("heartbeat packet: {}", e))?;
    let heartbeat_period = Duration::from_millis(config.link.heartbeat_interval_ms);
    let receive_cap = Duration::from_millis(config.serial.timeout_ms);

    info!(
        "Starting panel link loop (heartbeat every {}ms)",
        config.link.heartbeat_interval_ms
    );
    info!("Press Ctrl+C to exit");

    // One shutdown future for the whole loop: the SIGINT handler is
    // installed once and stays armed across every await point below
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());

    let mut packets_sent: u64 = 0;
    let mut packets_received: u64 = 0;
    let mut next_beat = Instant::now();

    // Main link loop: heartbeat on schedule, then drain panel traffic
    // until the next beat is due
    'link: loop {
        tokio::select! {
            _ = sleep_until(next_beat) => {}

            // Handle Ctrl+C for graceful shutdown
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break 'link;
            }
        }
        next_beat += heartbeat_period;

        if let Err(e) = panel.send_packet(&heartbeat).await {
            warn!("Failed to send heartbeat: {}", e);
            match reconnect(&config, &mut shutdown).await {
                Some(reopened) => panel = reopened,
                None => {
                    info!("Received Ctrl+C, shutting down...");
                    break 'link;
                }
            }
            continue;
        }
        packets_sent += 1;

        // Drain incoming packets until the next heartbeat is due
        loop {
            let window = receive_window(Instant::now(), next_beat, receive_cap);
            if window.is_zero() {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received Ctrl+C, shutting down...");
                    break 'link;
                }

                result = timeout(window, panel.receive_packet()) => {
                    match result {
                        Ok(Ok(received)) => {
                            packets_received += 1;
                            if let Err(e) = registry.execute(&received) {
                                warn!("Dispatch failed: {}", e);
                            }
                        }
                        Ok(Err(SimPanelError::Packet(status))) => {
                            // Rejected packets are dropped; the panel
                            // firmware requests a resend when it needs one
                            warn!("Dropped rejected packet: {}", status);
                        }
                        Ok(Err(e)) => {
                            warn!("Panel link lost: {}", e);
                            match reconnect(&config, &mut shutdown).await {
                                Some(reopened) => panel = reopened,
                                None => {
                                    info!("Received Ctrl+C, shutting down...");
                                    break 'link;
                                }
                            }
                        }
                        // Nothing arrived inside the window
                        Err(_) => {}
                    }
                }
            }
        }
    }

    info!(
        "Total packets sent: {}, received: {}",
        packets_sent, packets_received
    );

    Ok(())
}
