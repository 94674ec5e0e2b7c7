//! Sample journal: RAM ring buffer with commit-to-FRAM protocol.
//!
//! The logger is owned and mutated by the processing task alone, so no
//! locking protects the ring. Producers must never block on it: a full
//! ring rejects the push (drop-newest) and the caller accounts for the
//! loss. Flushing drains the ring in FIFO order into fixed-size records
//! at sequential FRAM addresses.
//!
//! ```text
//!  push ──▶ ┌─────────────────────┐          ┌──────────────┐
//!           │ ring (cap N, FIFO)  │──flush──▶│ FRAM records │
//!  clear ──▶└─────────────────────┘  drain   │ base + k·32  │
//! ```

use heapless::Deque;
use log::{debug, warn};

use crate::config::LOGGER_RING_CAPACITY;
use crate::error::StorageError;
use crate::ports::{FRAM_LOG_BASE, FRAM_LOG_REGION_BYTES, FramPort};
use crate::telemetry::{SAMPLE_RECORD_BYTES, Sample};

/// Push rejection: the ring is full and the sample was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFull;

/// Sample journal with capacity `N`.
pub struct Logger<const N: usize = LOGGER_RING_CAPACITY> {
    ring: Deque<Sample, N>,
    /// Next FRAM write offset from the log base; persists across flushes
    /// and wraps at the region end.
    write_offset: u32,
}

impl<const N: usize> Logger<N> {
    pub fn new() -> Self {
        Self {
            ring: Deque::new(),
            write_offset: 0,
        }
    }

    /// Non-blocking enqueue. Fails distinctly when full; the caller does
    /// not retry — the next acquisition cycle brings a fresh sample.
    pub fn push(&mut self, sample: Sample) -> Result<(), LogFull> {
        self.ring.push_back(sample).map_err(|_| LogFull)
    }

    /// Drain every buffered entry to FRAM in FIFO order.
    ///
    /// Each entry becomes one fixed-size record at a monotonically
    /// increasing address. A storage failure aborts the remainder of the
    /// drain: entries already written are gone from the ring, the failing
    /// entry and its successors stay buffered for the next commit cycle.
    ///
    /// Returns the number of records written.
    pub fn flush(&mut self, fram: &mut impl FramPort) -> Result<usize, StorageError> {
        let mut written = 0usize;

        while let Some(sample) = self.ring.front() {
            let record = match sample.to_record() {
                Ok(r) => r,
                Err(e) => {
                    // Unencodable entry: discard rather than wedge the ring.
                    warn!("logger: dropping unencodable entry: {e}");
                    self.ring.pop_front();
                    continue;
                }
            };

            let addr = FRAM_LOG_BASE + self.write_offset;
            if let Err(e) = fram.write(addr, &record) {
                warn!("logger: flush aborted after {written} records: {e}");
                return Err(e);
            }

            // Entry is durable; only now does it leave the ring.
            self.ring.pop_front();
            written += 1;
            self.write_offset =
                (self.write_offset + SAMPLE_RECORD_BYTES as u32) % FRAM_LOG_REGION_BYTES;
        }

        if written > 0 {
            debug!("logger: committed {written} records");
        }
        Ok(written)
    }

    /// Discard all buffered entries unconditionally. Used on logger
    /// re-initialization; does not touch FRAM.
    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// Approximate occupancy.
    ///
    /// Derived from the ring's free-space accounting; not guaranteed
    /// exact if a push races the read. Under the single-writer discipline
    /// of the processing task it is exact, but callers must not treat it
    /// as authoritative.
    pub fn count(&self) -> usize {
        self.ring.len()
    }

    /// True when a push would be rejected.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Next FRAM offset the flush cursor will write to.
    pub fn write_offset(&self) -> u32 {
        self.write_offset
    }
}

impl<const N: usize> Default for Logger<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mem_fram::MemFram;

    fn sample(ts_ms: u32) -> Sample {
        Sample {
            t_c: 3.0,
            ts_ms,
            ..Sample::default()
        }
    }

    #[test]
    fn flush_writes_in_push_order_and_empties() {
        let mut log: Logger<8> = Logger::new();
        let mut fram = MemFram::new();
        for ts in 0..5u32 {
            log.push(sample(ts)).unwrap();
        }
        let written = log.flush(&mut fram).unwrap();
        assert_eq!(written, 5);
        assert_eq!(log.count(), 0);

        for k in 0..5u32 {
            let addr = FRAM_LOG_BASE + k * SAMPLE_RECORD_BYTES as u32;
            let bytes = fram.read(addr, SAMPLE_RECORD_BYTES).unwrap();
            let back = Sample::from_record(&bytes).unwrap();
            assert_eq!(back.ts_ms, k, "records must land in push order");
        }
    }

    #[test]
    fn overflow_drops_newest_keeps_capacity_entries() {
        let mut log: Logger<4> = Logger::new();
        let mut fram = MemFram::new();
        for ts in 0..4u32 {
            log.push(sample(ts)).unwrap();
        }
        assert_eq!(log.push(sample(99)), Err(LogFull));
        assert_eq!(log.count(), 4);

        assert_eq!(log.flush(&mut fram).unwrap(), 4);
        // First `capacity` samples survive; the rejected one never entered.
        for k in 0..4u32 {
            let bytes = fram
                .read(k * SAMPLE_RECORD_BYTES as u32, SAMPLE_RECORD_BYTES)
                .unwrap();
            assert_eq!(Sample::from_record(&bytes).unwrap().ts_ms, k);
        }
    }

    #[test]
    fn flush_empty_is_idempotent_no_writes() {
        let mut log: Logger<4> = Logger::new();
        let mut fram = MemFram::new();
        assert_eq!(log.flush(&mut fram).unwrap(), 0);
        assert_eq!(fram.write_count(), 0);
    }

    #[test]
    fn failed_write_preserves_remaining_entries() {
        let mut log: Logger<8> = Logger::new();
        let mut fram = MemFram::new();
        for ts in 0..5u32 {
            log.push(sample(ts)).unwrap();
        }
        // Third write fails.
        fram.fail_after(2);
        assert!(log.flush(&mut fram).is_err());
        // Two written and removed; three remain for the next attempt.
        assert_eq!(log.count(), 3);

        fram.fail_after(u32::MAX);
        assert_eq!(log.flush(&mut fram).unwrap(), 3);
        assert_eq!(log.count(), 0);
        // All five records present, still in push order.
        for k in 0..5u32 {
            let bytes = fram
                .read(k * SAMPLE_RECORD_BYTES as u32, SAMPLE_RECORD_BYTES)
                .unwrap();
            assert_eq!(Sample::from_record(&bytes).unwrap().ts_ms, k);
        }
    }

    #[test]
    fn clear_discards_everything() {
        let mut log: Logger<4> = Logger::new();
        log.push(sample(1)).unwrap();
        log.push(sample(2)).unwrap();
        log.clear();
        assert_eq!(log.count(), 0);
        assert!(!log.is_full());
    }

    #[test]
    fn write_cursor_advances_across_flushes() {
        let mut log: Logger<4> = Logger::new();
        let mut fram = MemFram::new();
        log.push(sample(0)).unwrap();
        log.flush(&mut fram).unwrap();
        log.push(sample(1)).unwrap();
        log.flush(&mut fram).unwrap();

        // Second flush must not overwrite the first record.
        let bytes = fram.read(0, SAMPLE_RECORD_BYTES).unwrap();
        assert_eq!(Sample::from_record(&bytes).unwrap().ts_ms, 0);
        let bytes = fram
            .read(SAMPLE_RECORD_BYTES as u32, SAMPLE_RECORD_BYTES)
            .unwrap();
        assert_eq!(Sample::from_record(&bytes).unwrap().ts_ms, 1);
        assert_eq!(log.write_offset(), 2 * SAMPLE_RECORD_BYTES as u32);
    }

    #[test]
    fn write_cursor_wraps_at_region_end() {
        let mut log: Logger<4> = Logger::new();
        let records_per_region = (FRAM_LOG_REGION_BYTES as usize) / SAMPLE_RECORD_BYTES;
        // Park the cursor one record before the end.
        let mut fram = MemFram::new();
        for _ in 0..records_per_region - 1 {
            log.push(sample(0)).unwrap();
            log.flush(&mut fram).unwrap();
        }
        log.push(sample(7)).unwrap();
        log.flush(&mut fram).unwrap();
        assert_eq!(log.write_offset(), 0, "cursor must wrap to the base");
    }
}
