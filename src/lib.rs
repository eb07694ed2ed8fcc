//! # SimPanel Bridge Library
//!
//! Bridge a flight-simulator radio control panel to the host over a serial
//! link.
//!
//! This library implements the framed packet protocol the panel firmware
//! speaks (marker-delimited frames with a CRC-16 integrity check), the
//! serial transport that carries it, and the dispatch layer that routes
//! validated packets to their handlers.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod packet;
pub mod serial;
