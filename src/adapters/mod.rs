//! Driven adapters behind the port traits.
//!
//! The raw I2C/ADC/GPIO/SPI drivers live outside this crate; what ships
//! here are the simulation adapters the node runs with on a host build
//! and the tests run with everywhere. They honor the exact port
//! contracts, so swapping in hardware adapters changes no core code.

pub mod mem_fram;
pub mod sim_relay;
pub mod sim_sensors;
