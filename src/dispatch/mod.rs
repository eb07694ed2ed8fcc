//! # Packet Dispatch Module
//!
//! Routes validated packets to their registered handlers.
//!
//! Each handler (a *process*) owns one command identifier. The registry is
//! consulted only after a packet has passed validation, so handlers always
//! see payload bytes from a well-formed frame. The payload stays opaque
//! here; interpreting it is the process's job.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Result, SimPanelError};
use crate::packet::protocol::{Packet, PacketIdentifier};

/// A handler for one packet identifier
pub trait PacketProcess: Send {
    /// Human-readable process name, used in logs
    fn name(&self) -> &str;

    /// Handle the payload of one validated packet
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be processed; the error is
    /// propagated to the dispatch caller, never retried here.
    fn process_packet(&mut self, payload: &[u8]) -> Result<()>;
}

/// Registry mapping command identifiers to processes
#[derive(Default)]
pub struct ProcessRegistry {
    processes: HashMap<u8, Box<dyn PacketProcess>>,
}

impl ProcessRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            processes: HashMap::new(),
        }
    }

    /// Register a process for a command identifier
    ///
    /// A later registration for the same identifier replaces the earlier
    /// one.
    pub fn register(&mut self, identifier: PacketIdentifier, process: Box<dyn PacketProcess>) {
        self.register_raw(identifier.into(), process);
    }

    /// Register a process for a raw identifier byte
    pub fn register_raw(&mut self, identifier: u8, process: Box<dyn PacketProcess>) {
        debug!(
            "Registering process '{}' for identifier 0x{:02X}",
            process.name(),
            identifier
        );
        self.processes.insert(identifier, process);
    }

    /// Number of registered processes
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// True when no process is registered
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Dispatch a validated packet to its process
    ///
    /// # Errors
    ///
    /// Returns [`SimPanelError::UnhandledPacket`] when no process is
    /// registered for the packet's identifier, or the process's own error.
    pub fn execute(&mut self, packet: &Packet) -> Result<()> {
        match self.processes.get_mut(&packet.identifier) {
            Some(process) => {
                debug!(
                    "Executing process '{}' for identifier 0x{:02X} ({} payload bytes)",
                    process.name(),
                    packet.identifier,
                    packet.payload.len()
                );
                process.process_packet(&packet.payload)
            }
            None => {
                warn!(
                    "No process registered for packet identifier 0x{:02X}",
                    packet.identifier
                );
                Err(SimPanelError::UnhandledPacket(packet.identifier))
            }
        }
    }
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("processes", &self.processes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test process that records every payload it sees
    struct RecordingProcess {
        seen: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl PacketProcess for RecordingProcess {
        fn name(&self) -> &str {
            "recording"
        }

        fn process_packet(&mut self, payload: &[u8]) -> Result<()> {
            self.seen.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    /// Test process that always fails
    struct FailingProcess;

    impl PacketProcess for FailingProcess {
        fn name(&self) -> &str {
            "failing"
        }

        fn process_packet(&mut self, _payload: &[u8]) -> Result<()> {
            Err(SimPanelError::Serial("process failure".to_string()))
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ProcessRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_execute_dispatches_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProcessRegistry::new();
        registry.register(
            PacketIdentifier::UpdateFreq,
            Box::new(RecordingProcess { seen: seen.clone() }),
        );

        let packet =
            Packet::with_identifier(PacketIdentifier::UpdateFreq, vec![0x00, 0x76]).unwrap();
        registry.execute(&packet).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![vec![0x00, 0x76]]);
    }

    #[test]
    fn test_execute_unhandled_identifier() {
        let mut registry = ProcessRegistry::new();

        let packet = Packet::with_identifier(PacketIdentifier::Heartbeat, vec![0x01]).unwrap();
        let result = registry.execute(&packet);

        assert!(matches!(
            result.unwrap_err(),
            SimPanelError::UnhandledPacket(0xFF)
        ));
    }

    #[test]
    fn test_execute_propagates_process_error() {
        let mut registry = ProcessRegistry::new();
        registry.register(PacketIdentifier::LedToggle, Box::new(FailingProcess));

        let packet = Packet::with_identifier(PacketIdentifier::LedToggle, vec![0x01]).unwrap();
        let result = registry.execute(&packet);

        assert!(matches!(result.unwrap_err(), SimPanelError::Serial(_)));
    }

    #[test]
    fn test_register_replaces_existing() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let mut registry = ProcessRegistry::new();
        registry.register(
            PacketIdentifier::EncoderAdj,
            Box::new(RecordingProcess {
                seen: first.clone(),
            }),
        );
        registry.register(
            PacketIdentifier::EncoderAdj,
            Box::new(RecordingProcess {
                seen: second.clone(),
            }),
        );
        assert_eq!(registry.len(), 1);

        let packet = Packet::with_identifier(PacketIdentifier::EncoderAdj, vec![0x01]).unwrap();
        registry.execute(&packet).unwrap();

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }
}
