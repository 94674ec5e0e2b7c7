//! Cold-chain node control core.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. Hardware drivers (I2C sensors, relay GPIO, SPI FRAM) live
//! behind the port traits in [`ports`]; the crate ships simulation
//! adapters and runs the full pipeline on a host.

#![deny(unused_must_use)]

pub mod acq;
pub mod alarm;
pub mod bus;
pub mod channels;
pub mod config;
pub mod logger;
pub mod proc;
pub mod telemetry;
pub mod timer;
pub mod wiring;

mod error;

pub mod adapters;
pub mod ports;

pub use error::{Error, Result, SensorError, StorageError};
