//! Inter-task communication channels.
//!
//! Bounded crossbeam channels carry data by value between tasks; nothing
//! else crosses a task edge. Producers never block: a full channel drops
//! the item, and every drop lands in [`PipelineCounters`] so the loss is
//! observable instead of silent.
//!
//! ```text
//! ┌──────────────┐   Sample    ┌──────────────┐  flag word  ┌───────────┐
//! │ Acquisition  │────────────▶│  Processing  │────────────▶│ Telemetry │
//! │   (1 Hz)     │  depth 16   │   (50 ms rx) │  depth 16   │ consumers │
//! └──────────────┘             └──────────────┘             └───────────┘
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::{EVENT_QUEUE_DEPTH, SAMPLE_QUEUE_DEPTH};
use crate::telemetry::Sample;

/// Create the sample channel: acquisition → processing.
pub fn sample_channel() -> (Sender<Sample>, Receiver<Sample>) {
    bounded(SAMPLE_QUEUE_DEPTH)
}

/// Create the event channel: processing → telemetry/command consumers.
/// Carries one 32-bit flag word per processed sample.
pub fn event_channel() -> (Sender<u32>, Receiver<u32>) {
    bounded(EVENT_QUEUE_DEPTH)
}

/// Create a wake signal: depth 1, so repeated requests coalesce instead
/// of queueing. Used for "sample now" and "force re-evaluation".
pub fn wake_signal() -> (Sender<()>, Receiver<()>) {
    bounded(1)
}

// ───────────────────────────────────────────────────────────────
// Drop accounting
// ───────────────────────────────────────────────────────────────

/// Shared counters for every point where the pipeline sheds data.
///
/// Drop-newest is a deliberate policy (boundedness over completeness for a
/// live telemetry stream), but it must be testable and surfaceable, not
/// assumed. Counters are monotonic and relaxed; readers get a snapshot,
/// not a synchronized view.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    /// Samples dropped on a full sample channel.
    pub samples_dropped: AtomicU32,
    /// Flag words dropped on a full event channel.
    pub events_dropped: AtomicU32,
    /// Samples rejected by a full log ring.
    pub log_dropped: AtomicU32,
    /// Flush attempts that hit a storage failure.
    pub flush_failures: AtomicU32,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for telemetry/diagnostics consumers.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            log_dropped: self.log_dropped.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub samples_dropped: u32,
    pub events_dropped: u32,
    pub log_dropped: u32,
    pub flush_failures: u32,
}
