//! System configuration parameters.
//!
//! All tunable parameters for the cold-chain node. Values are fixed at
//! build time; the [`SystemConfig`] struct exists so the thresholds travel
//! into each task as an explicit context object instead of ambient
//! constants, and so tests can substitute tighter timings.

use serde::{Deserialize, Serialize};

// --- Periods (ms) ---
/// Sensor acquisition cadence: 1 Hz.
pub const PERIOD_ACQ_MS: u64 = 1000;
/// Processing-task receive timeout; bounds commit latency when idle.
pub const PROC_RECV_TIMEOUT_MS: u64 = 50;
/// Logger flush-to-FRAM cadence.
pub const COMMIT_MS: u64 = 10_000;

// --- Temperature thresholds (°C) ---
/// Cold-chain upper bound.
pub const TEMP_HIGH_C: f32 = 4.0;
/// Cold-chain lower bound.
pub const TEMP_LOW_C: f32 = 0.0;
/// Hysteresis margin for alarm clear and relay latch.
pub const TEMP_HYST_C: f32 = 0.5;
/// Temperature out of range for longer than this promotes to an alarm.
pub const ALARM_DWELL_MS: u32 = 5000;

// --- Supply monitoring ---
/// Vin below this stamps the VIN_LOW flag (nominal 24 V supply).
pub const VIN_LOW_V: f32 = 18.0;

// --- Queues / journaling ---
/// Sample channel depth (acquisition → processing).
pub const SAMPLE_QUEUE_DEPTH: usize = 16;
/// Event channel depth (processing → telemetry consumers).
pub const EVENT_QUEUE_DEPTH: usize = 16;
/// Ring buffer capacity before drop-newest kicks in.
pub const LOGGER_RING_CAPACITY: usize = 512;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Thresholds ---
    /// Upper temperature bound (°C).
    pub temp_high_c: f32,
    /// Lower temperature bound (°C).
    pub temp_low_c: f32,
    /// Hysteresis margin (°C).
    pub temp_hyst_c: f32,
    /// Out-of-range dwell before alarm (milliseconds).
    pub alarm_dwell_ms: u32,
    /// Supply-voltage low threshold (V).
    pub vin_low_v: f32,

    // --- Timing ---
    /// Acquisition period (milliseconds).
    pub period_acq_ms: u64,
    /// Processing receive timeout (milliseconds).
    pub proc_recv_timeout_ms: u64,
    /// Commit (flush) period (milliseconds).
    pub commit_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            temp_high_c: TEMP_HIGH_C,
            temp_low_c: TEMP_LOW_C,
            temp_hyst_c: TEMP_HYST_C,
            alarm_dwell_ms: ALARM_DWELL_MS,
            vin_low_v: VIN_LOW_V,
            period_acq_ms: PERIOD_ACQ_MS,
            proc_recv_timeout_ms: PROC_RECV_TIMEOUT_MS,
            commit_ms: COMMIT_MS,
        }
    }
}
