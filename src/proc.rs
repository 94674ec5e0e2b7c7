//! Processing task: alarm/relay decisions, bus upkeep, journaling.
//!
//! Consumes samples from the acquisition task and runs the per-sample
//! pipeline in a fixed order:
//!
//! 1. bounded-timeout receive (or a force-reeval wake, which only
//!    unblocks the wait — no recomputation happens without a sample)
//! 2. alarm dwell machine → alarm stamp bits onto the sample
//! 3. relay latch → one `set_relay` call per latch change, never more
//! 4. event-bus level bits recomputed to current truth (set the true
//!    ones, clear the false ones — a stale bit never survives a cycle)
//! 5. push the stamped sample into the journal
//! 6. non-blocking read-and-clear of COMMIT_REQ; flush synchronously if
//!    set — commit latency is bounded by sample arrival, not wall clock
//! 7. best-effort emit of the flag word to telemetry consumers
//!
//! Alarm state, relay latch, and the journal are owned here exclusively;
//! the event bus is the only shared object this task touches.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, never, select};
use log::{debug, info, warn};

use crate::alarm::{AlarmMonitor, RelayLatch};
use crate::bus::{EventBus, SysFlags};
use crate::channels::PipelineCounters;
use crate::config::SystemConfig;
use crate::logger::Logger;
use crate::ports::{FramPort, RelayPort};
use crate::telemetry::{Sample, SampleFlags};

/// The processing task.
pub struct ProcessingTask<R: RelayPort, F: FramPort> {
    config: SystemConfig,
    sample_rx: Receiver<Sample>,
    reeval_rx: Receiver<()>,
    event_tx: Sender<u32>,
    bus: Arc<EventBus>,
    relay: R,
    fram: F,
    logger: Logger,
    alarm: AlarmMonitor,
    latch: RelayLatch,
    /// Relay state as last commanded; actuation fires only on change.
    relay_on: bool,
    counters: Arc<PipelineCounters>,
    /// Last processed sample, published for read-only consumers.
    last: Arc<Mutex<Sample>>,
}

impl<R: RelayPort, F: FramPort> ProcessingTask<R, F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SystemConfig,
        sample_rx: Receiver<Sample>,
        reeval_rx: Receiver<()>,
        event_tx: Sender<u32>,
        bus: Arc<EventBus>,
        relay: R,
        fram: F,
        counters: Arc<PipelineCounters>,
        last: Arc<Mutex<Sample>>,
    ) -> Self {
        let alarm = AlarmMonitor::new(&config);
        let latch = RelayLatch::new(&config);
        Self {
            config,
            sample_rx,
            reeval_rx,
            event_tx,
            bus,
            relay,
            fram,
            logger: Logger::new(),
            alarm,
            latch,
            relay_on: false,
            counters,
            last,
        }
    }

    /// Run until the sample channel disconnects.
    ///
    /// Every blocking wait is bounded by the receive timeout, so the
    /// loop always makes forward progress even when no samples arrive.
    pub fn run(mut self) {
        let timeout = Duration::from_millis(self.config.proc_recv_timeout_ms);
        let sample_rx = self.sample_rx.clone();
        let mut reeval_rx = self.reeval_rx.clone();

        loop {
            select! {
                recv(sample_rx) -> msg => match msg {
                    Ok(sample) => self.step(sample),
                    Err(_) => {
                        debug!("proc: sample channel closed, stopping");
                        // Journaled samples must not die with the task.
                        self.final_flush();
                        return;
                    }
                },
                recv(reeval_rx) -> msg => match msg {
                    // A wake only unblocks the receive; the next sample
                    // (or timeout) drives the pipeline as usual.
                    Ok(()) => debug!("proc: force-reeval wake"),
                    Err(_) => {
                        // Handle dropped: stop selecting on it.
                        reeval_rx = never();
                    }
                },
                default(timeout) => {}
            }
        }
    }

    /// Process one sample through stages 2–7.
    pub fn step(&mut self, sample: Sample) {
        // 2. Alarm machine stamps the flags for this sample.
        let mut s = sample;
        let stamp = self.alarm.update(s.t_c, s.ts_ms);
        s.flags.set(stamp);

        // 3. Relay latch; actuate exactly once per change.
        let want = self.latch.update(s.t_c);
        if want != self.relay_on {
            self.relay_on = want;
            info!("proc: relay {} at t={:.2}°C", if want { "ON" } else { "OFF" }, s.t_c);
            self.relay.set_relay(want);
        }

        // 4. Level bits reflect this sample's truth, set and cleared.
        self.apply_sys_bits(&s);

        // Publish for read-only consumers before journaling.
        *self.last.lock().expect("last-sample lock poisoned") = s;

        // 5. Journal; full ring drops newest and counts.
        if self.logger.push(s).is_err() {
            PipelineCounters::bump(&self.counters.log_dropped);
        }

        // 6. Commit on request; read-and-clear keeps it at-most-once.
        let bits = self
            .bus
            .wait(SysFlags::COMMIT_REQ, true, false, Duration::ZERO);
        if bits.contains(SysFlags::COMMIT_REQ) {
            match self.logger.flush(&mut self.fram) {
                Ok(n) => debug!("proc: commit wrote {n} records"),
                Err(e) => {
                    warn!("proc: commit failed: {e}");
                    PipelineCounters::bump(&self.counters.flush_failures);
                }
            }
        }

        // 7. Best-effort flag-word broadcast.
        if self.event_tx.try_send(s.flags.bits()).is_err() {
            PipelineCounters::bump(&self.counters.events_dropped);
        }
    }

    /// Number of journal entries awaiting commit (approximate contract,
    /// exact here under single-writer ownership).
    pub fn log_count(&self) -> usize {
        self.logger.count()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Commit whatever is still buffered before the task exits.
    fn final_flush(&mut self) {
        match self.logger.flush(&mut self.fram) {
            Ok(0) => {}
            Ok(n) => info!("proc: shutdown flush wrote {n} records"),
            Err(e) => {
                warn!("proc: shutdown flush failed: {e}");
                PipelineCounters::bump(&self.counters.flush_failures);
            }
        }
    }

    fn apply_sys_bits(&self, s: &Sample) {
        let mut set = SysFlags::NONE;
        let mut clear = SysFlags::NONE;

        let mut level = |bit: SysFlags, on: bool| {
            if on {
                set = set | bit;
            } else {
                clear = clear | bit;
            }
        };

        level(SysFlags::DOOR_OPEN, s.door);
        level(
            SysFlags::SENSOR_FAULT,
            s.flags.contains(SampleFlags::SENSOR_FAULT),
        );
        level(SysFlags::ALARM_ACTIVE, self.alarm.is_active());

        if !set.is_empty() {
            self.bus.set(set);
        }
        if !clear.is_empty() {
            self.bus.clear(clear);
        }
    }
}
