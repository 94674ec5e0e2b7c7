//! Telemetry sample type and per-sample flag word.
//!
//! A [`Sample`] is produced once per acquisition cycle and copied by value
//! across every task boundary — no shared ownership ever crosses a task
//! edge. The same struct doubles as the FRAM journal record, serialized
//! into a fixed-size slot so the log region stays plainly addressable.

use core::fmt;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Sample flags
// ───────────────────────────────────────────────────────────────

/// Per-sample status/alarm bits, carried inside the sample and broadcast
/// as a bare `u32` word on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleFlags(pub u32);

impl SampleFlags {
    pub const NONE: Self = Self(0);
    /// Temperature above the high bound while the alarm is active.
    pub const ALARM_HIGH: Self = Self(1 << 0);
    /// Temperature below the low bound while the alarm is active.
    pub const ALARM_LOW: Self = Self(1 << 1);
    /// Door switch open at acquisition time.
    pub const DOOR_OPEN: Self = Self(1 << 2);
    /// Temp/humidity sensor failed to read; t_c/rh_pct carry defaults.
    pub const SENSOR_FAULT: Self = Self(1 << 3);
    /// Supply voltage below the low threshold.
    pub const VIN_LOW: Self = Self(1 << 4);

    /// Set the given bits.
    pub fn set(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the given bits.
    pub fn clear(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// True if every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw flag word as sent to telemetry consumers.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SampleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(SampleFlags, &str); 5] = [
            (SampleFlags::ALARM_HIGH, "ALARM_HIGH"),
            (SampleFlags::ALARM_LOW, "ALARM_LOW"),
            (SampleFlags::DOOR_OPEN, "DOOR_OPEN"),
            (SampleFlags::SENSOR_FAULT, "SENSOR_FAULT"),
            (SampleFlags::VIN_LOW, "VIN_LOW"),
        ];
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Sample
// ───────────────────────────────────────────────────────────────

/// One full telemetry measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Air temperature (°C).
    pub t_c: f32,
    /// MCU die temperature (°C).
    pub t_mcu_c: f32,
    /// Relative humidity (%).
    pub rh_pct: f32,
    /// Supply voltage (V).
    pub vin_v: f32,
    /// Door switch: true = open.
    pub door: bool,
    /// Status/alarm bits.
    pub flags: SampleFlags,
    /// Monotonic milliseconds since boot.
    pub ts_ms: u32,
}

/// Fixed FRAM record slot size in bytes.
///
/// Postcard encodes a `Sample` in at most 27 bytes (4×f32 little-endian,
/// one bool byte, two varint u32). The slot is padded to a power of two so
/// record K always lives at `base + K * SAMPLE_RECORD_BYTES`.
pub const SAMPLE_RECORD_BYTES: usize = 32;

/// Record encode/decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Serialized sample did not fit the fixed slot.
    Overflow,
    /// Stored bytes did not decode to a sample.
    Corrupted,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "record overflows fixed slot"),
            Self::Corrupted => write!(f, "record corrupted"),
        }
    }
}

impl Sample {
    /// Serialize into a zero-padded fixed-size FRAM record.
    pub fn to_record(&self) -> Result<[u8; SAMPLE_RECORD_BYTES], RecordError> {
        let mut slot = [0u8; SAMPLE_RECORD_BYTES];
        postcard::to_slice(self, &mut slot).map_err(|_| RecordError::Overflow)?;
        Ok(slot)
    }

    /// Decode a sample from a fixed-size FRAM record.
    pub fn from_record(slot: &[u8]) -> Result<Self, RecordError> {
        postcard::from_bytes(slot).map_err(|_| RecordError::Corrupted)
    }
}
