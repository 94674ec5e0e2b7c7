//! In-memory FRAM simulation.
//!
//! Byte-for-byte stand-in for an MB85RS-class SPI FRAM: flat address
//! space, no erase cycles, writes land immediately. Failure injection
//! (`fail_after`) exercises the logger's partial-flush recovery path.

use log::debug;

use crate::error::StorageError;
use crate::ports::{FRAM_LOG_REGION_BYTES, FramPort};

/// RAM-backed FRAM with injectable write failure.
pub struct MemFram {
    mem: Vec<u8>,
    writes: u32,
    /// Writes still allowed before injected failures begin.
    write_budget: u32,
}

impl MemFram {
    pub fn new() -> Self {
        Self {
            mem: vec![0; FRAM_LOG_REGION_BYTES as usize],
            writes: 0,
            write_budget: u32::MAX,
        }
    }

    /// Allow `budget` more successful writes; everything after fails
    /// with [`StorageError::WriteFailed`] until the budget is reset.
    pub fn fail_after(&mut self, budget: u32) {
        self.write_budget = budget;
    }

    /// Total successful writes since construction.
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), StorageError> {
        let end = addr as usize + len;
        if end > self.mem.len() {
            return Err(StorageError::AddressOutOfRange);
        }
        Ok(())
    }
}

impl Default for MemFram {
    fn default() -> Self {
        Self::new()
    }
}

impl FramPort for MemFram {
    fn init(&mut self) -> Result<(), StorageError> {
        debug!("mem-fram: {} byte region ready", self.mem.len());
        Ok(())
    }

    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), StorageError> {
        self.check_range(addr, bytes.len())?;
        if self.write_budget == 0 {
            return Err(StorageError::WriteFailed);
        }
        self.write_budget = self.write_budget.saturating_sub(1);
        self.mem[addr as usize..addr as usize + bytes.len()].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    fn read(&mut self, addr: u32, len: usize) -> Result<Vec<u8>, StorageError> {
        self.check_range(addr, len)?;
        Ok(self.mem[addr as usize..addr as usize + len].to_vec())
    }

    fn clear_region(&mut self) -> Result<(), StorageError> {
        self.mem.fill(0);
        Ok(())
    }
}
