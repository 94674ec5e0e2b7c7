//! Simulated cooling relay.
//!
//! Records every actuation so tests can assert the "exactly once per
//! latch change" contract, and logs transitions the way the GPIO driver
//! would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::info;

use crate::ports::RelayPort;

/// Relay stand-in with shared observable state.
pub struct SimRelay {
    state: Arc<RelayProbe>,
}

/// Shared view of the simulated relay, for tests and the monitor loop.
#[derive(Debug, Default)]
pub struct RelayProbe {
    on: AtomicBool,
    actuations: AtomicU32,
}

impl RelayProbe {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    /// Number of `set_relay` calls observed.
    pub fn actuations(&self) -> u32 {
        self.actuations.load(Ordering::Relaxed)
    }
}

impl SimRelay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RelayProbe::default()),
        }
    }

    /// Handle for observing the relay from another thread.
    pub fn probe(&self) -> Arc<RelayProbe> {
        Arc::clone(&self.state)
    }
}

impl Default for SimRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPort for SimRelay {
    fn set_relay(&mut self, on: bool) {
        info!("relay: {}", if on { "ON" } else { "OFF" });
        self.state.on.store(on, Ordering::Relaxed);
        self.state.actuations.fetch_add(1, Ordering::Relaxed);
    }
}
