//! DSMR P1 smart meter gateway core
//!
//! Requests a telegram from the meter over the P1 port handshake, frames and
//! decodes it into a typed measurement snapshot, and fans the snapshot out to
//! subscribers.

pub mod config;
pub mod hal;
pub mod hub;
pub mod metering_p1;

// Re-export common types for easier access
pub use config::{Config, ConfigError, P1Config};
pub use hal::{ControlLines, LineSource, NullControlLines};
pub use hub::{MeasurementSink, NotificationHub};
pub use metering_p1::structs::{FixedValue, MeasurementRecord, ReaderState};
pub use metering_p1::P1Reader;
