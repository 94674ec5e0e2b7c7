//! Startup wiring: construct shared objects in dependency order, then
//! start tasks, then arm the timer.
//!
//! The order is load-bearing and matches the lifecycle contract:
//!
//! 1. channels and event bus (leaves first)
//! 2. commit timer bound to the bus — created, not armed
//! 3. storage init, then acquisition and processing threads, each handed
//!    the already-created channels/bus
//! 4. only when every task exists, arm the timer
//!
//! Any failure before step 4 is fatal: no task ever observes an
//! uninitialized collaborator. There are no ambient globals — every
//! shared object lives in [`Node`] and travels by handle.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::info;

use crate::acq::AcquisitionTask;
use crate::bus::EventBus;
use crate::channels::{CounterSnapshot, PipelineCounters, event_channel, sample_channel, wake_signal};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::ports::{FramPort, RelayPort, SensorPort};
use crate::proc::ProcessingTask;
use crate::telemetry::Sample;
use crate::timer::CommitTimer;

/// A running cold-chain node: task threads plus the handles external
/// consumers are allowed to touch.
pub struct Node {
    bus: Arc<EventBus>,
    event_rx: Receiver<u32>,
    counters: Arc<PipelineCounters>,
    last: Arc<Mutex<Sample>>,
    sample_now_tx: Sender<()>,
    reeval_tx: Sender<()>,
    _timer: CommitTimer,
    acq_thread: JoinHandle<()>,
    proc_thread: JoinHandle<()>,
}

impl Node {
    /// Bring the whole pipeline up. Fatal on any construction failure.
    pub fn bring_up<S, R, F>(
        config: SystemConfig,
        sensors: S,
        relay: R,
        mut fram: F,
    ) -> Result<Self>
    where
        S: SensorPort + Send + 'static,
        R: RelayPort + Send + 'static,
        F: FramPort + Send + 'static,
    {
        // 1. Leaves: channels, bus, counters, last-sample cell.
        let (sample_tx, sample_rx) = sample_channel();
        let (event_tx, event_rx) = event_channel();
        let (sample_now_tx, sample_now_rx) = wake_signal();
        let (reeval_tx, reeval_rx) = wake_signal();
        let bus = Arc::new(EventBus::new());
        let counters = Arc::new(PipelineCounters::new());
        let last = Arc::new(Mutex::new(Sample::default()));

        // 2. Commit timer bound to the bus; armed last.
        let mut timer = CommitTimer::new(Arc::clone(&bus), Duration::from_millis(config.commit_ms));

        // 3. Storage must be ready before the task that flushes to it.
        fram.init()?;

        let acq = AcquisitionTask::new(
            sensors,
            config.clone(),
            sample_tx,
            sample_now_rx,
            Arc::clone(&counters),
        );
        let acq_thread = thread::Builder::new()
            .name("acq".into())
            .spawn(move || acq.run())
            .map_err(|_| Error::Init("acquisition thread"))?;

        let proc = ProcessingTask::new(
            config,
            sample_rx,
            reeval_rx,
            event_tx,
            Arc::clone(&bus),
            relay,
            fram,
            Arc::clone(&counters),
            Arc::clone(&last),
        );
        let proc_thread = thread::Builder::new()
            .name("proc".into())
            .spawn(move || proc.run())
            .map_err(|_| Error::Init("processing thread"))?;

        // 4. Every consumer of the bus exists; now the timer may fire.
        timer.arm()?;

        info!("node up: acq + proc running, commit timer armed");
        Ok(Self {
            bus,
            event_rx,
            counters,
            last,
            sample_now_tx,
            reeval_tx,
            _timer: timer,
            acq_thread,
            proc_thread,
        })
    }

    /// Ask the acquisition task to sample now instead of waiting out the
    /// period. Coalesces with an already-pending request.
    pub fn request_immediate_sample(&self) {
        let _ = self.sample_now_tx.try_send(());
    }

    /// Nudge the processing task out of its blocking receive. Does not
    /// synthesize a sample.
    pub fn force_reeval(&self) {
        let _ = self.reeval_tx.try_send(());
    }

    /// Shared flag bus, for signaling consumers (read-only by contract).
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Event-channel receiver: one 32-bit flag word per processed sample.
    pub fn events(&self) -> &Receiver<u32> {
        &self.event_rx
    }

    /// Copy of the last processed sample (stamped flags included).
    pub fn last_sample(&self) -> Sample {
        *self.last.lock().expect("last-sample lock poisoned")
    }

    /// Snapshot of the drop/failure counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Tear the pipeline down in reverse order and join the threads.
    pub fn shut_down(self) {
        let Node {
            sample_now_tx,
            reeval_tx,
            _timer,
            acq_thread,
            proc_thread,
            ..
        } = self;
        // Timer first, then the wake handles; the acquisition task sees
        // its signal channel close, exits, and closes the sample channel
        // behind it, which stops the processing task.
        drop(_timer);
        drop(sample_now_tx);
        drop(reeval_tx);
        let _ = acq_thread.join();
        let _ = proc_thread.join();
        info!("node down");
    }
}
