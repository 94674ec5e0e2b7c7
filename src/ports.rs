//! Port traits — the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ tasks (domain)
//! ```
//!
//! Driven adapters (sensor bus, relay GPIO, FRAM) implement these traits.
//! The acquisition and processing tasks consume them via generics, so the
//! core never touches hardware directly and the whole pipeline runs under
//! test with mock adapters.

use crate::error::{SensorError, StorageError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → acquisition task)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the acquisition task calls this once per cycle.
///
/// Only the temp/humidity read is fallible in a way the pipeline cares
/// about; a failure flags the sample as faulted but never halts it. The
/// ADC and GPIO reads return best-effort values.
pub trait SensorPort {
    /// Read air temperature (°C) and relative humidity (%).
    fn read_temp_humidity(&mut self) -> Result<(f32, f32), SensorError>;

    /// Read the MCU die temperature (°C).
    fn read_mcu_temp(&mut self) -> f32;

    /// Read the supply voltage (V).
    fn read_supply_voltage(&mut self) -> f32;

    /// Read the door switch: true = open.
    fn read_door(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: processing task → cooling relay)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the processing task calls this exactly once per
/// latch change, never per sample.
pub trait RelayPort {
    /// Energize (true) or release (false) the cooling relay.
    fn set_relay(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// FRAM port (driven adapter: logger → persistent storage)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable persistent storage for the sample journal.
///
/// The address space begins at [`FRAM_LOG_BASE`]; the logger writes
/// fixed-size records sequentially and wraps at the region end.
pub trait FramPort {
    /// Prepare the device. Called once during wiring; failure is fatal.
    fn init(&mut self) -> Result<(), StorageError>;

    /// Write `bytes` at `addr`.
    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read `len` bytes from `addr`.
    fn read(&mut self, addr: u32, len: usize) -> Result<Vec<u8>, StorageError>;

    /// Erase the whole log region.
    fn clear_region(&mut self) -> Result<(), StorageError>;
}

/// Base address of the log region.
pub const FRAM_LOG_BASE: u32 = 0x0000;

/// Log region size in bytes (MB85RS-class part, 32 KiB reserved for logs).
pub const FRAM_LOG_REGION_BYTES: u32 = 32 * 1024;
