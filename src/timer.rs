//! Commit timer.
//!
//! Fires on a fixed period and does exactly one thing: set `COMMIT_REQ`
//! on the event bus. The processing task consumes the bit with
//! read-and-clear, so a period produces at most one flush no matter how
//! long the bit sits unobserved.
//!
//! The timer is created bound to the bus during wiring but stays unarmed
//! until every task exists; arming is the last lifecycle step.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};
use log::{debug, info};

use crate::bus::{EventBus, SysFlags};
use crate::error::{Error, Result};

/// Periodic commit-request trigger.
pub struct CommitTimer {
    bus: Arc<EventBus>,
    period: Duration,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CommitTimer {
    /// Create unarmed, bound to the bus it will signal.
    pub fn new(bus: Arc<EventBus>, period: Duration) -> Self {
        Self {
            bus,
            period,
            stop_tx: None,
            thread: None,
        }
    }

    /// Start firing. Call only after every consumer task is running.
    pub fn arm(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(self.period);
        let bus = Arc::clone(&self.bus);

        let thread = thread::Builder::new()
            .name("commit-timer".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            debug!("commit timer: requesting flush");
                            bus.set(SysFlags::COMMIT_REQ);
                        }
                        recv(stop_rx) -> _ => return,
                    }
                }
            })
            .map_err(|_| Error::Init("commit timer thread"))?;

        info!("commit timer armed ({} ms)", self.period.as_millis());
        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        Ok(())
    }

    /// True once armed.
    pub fn is_armed(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for CommitTimer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.try_send(());
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}
