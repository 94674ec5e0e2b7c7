//! Acquisition task: samples every sensor on a fixed cadence.
//!
//! The loop blocks on "period or signal": either the 1 Hz deadline
//! elapses, or an immediate-sample request arrives, in which case the
//! period phase resets to now (no compounding drift, no double fire).
//! Periodic wakeups advance the deadline from the previous deadline, not
//! from wake time, so the cadence stays phase-locked; deadlines missed
//! during a stall are skipped rather than replayed.
//!
//! A temp/humidity read failure flags the sample and reuses the last
//! good values — a fault never halts the pipeline. Submission to the
//! sample channel is non-blocking; a full channel drops the sample and
//! counts it, and the next cycle brings a fresh one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::channels::PipelineCounters;
use crate::config::SystemConfig;
use crate::ports::SensorPort;
use crate::telemetry::{Sample, SampleFlags};

/// The acquisition task. Owns its sensor adapter; nothing it mutates is
/// visible to any other task except by value through the sample channel.
pub struct AcquisitionTask<S: SensorPort> {
    sensors: S,
    config: SystemConfig,
    sample_tx: Sender<Sample>,
    wake_rx: Receiver<()>,
    counters: Arc<PipelineCounters>,
    boot: Instant,
    /// Last successful temp/humidity pair, reused on sensor fault.
    last_th: (f32, f32),
}

impl<S: SensorPort> AcquisitionTask<S> {
    pub fn new(
        sensors: S,
        config: SystemConfig,
        sample_tx: Sender<Sample>,
        wake_rx: Receiver<()>,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            sensors,
            config,
            sample_tx,
            wake_rx,
            counters,
            boot: Instant::now(),
            last_th: (0.0, 0.0),
        }
    }

    /// Run until the wake handle and sample channel are gone.
    pub fn run(mut self) {
        let period = Duration::from_millis(self.config.period_acq_ms);
        let mut deadline = Instant::now() + period;

        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match self.wake_rx.recv_timeout(timeout) {
                Ok(()) => {
                    debug!("acq: immediate sample requested");
                    // Re-phase so the next periodic fire is a full period out.
                    deadline = Instant::now() + period;
                }
                Err(RecvTimeoutError::Timeout) => {
                    deadline = next_deadline(deadline, Instant::now(), period);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("acq: control handles dropped, stopping");
                    return;
                }
            }

            let sample = self.acquire_once();
            if self.sample_tx.try_send(sample).is_err() {
                // Drop-newest; the loss is counted, never retried.
                PipelineCounters::bump(&self.counters.samples_dropped);
            }
        }
    }

    /// Read every sensor and build one sample.
    pub fn acquire_once(&mut self) -> Sample {
        let mut flags = SampleFlags::NONE;

        let (t_c, rh_pct) = match self.sensors.read_temp_humidity() {
            Ok(th) => {
                self.last_th = th;
                th
            }
            Err(e) => {
                warn!("acq: temp/humidity read failed: {e}");
                flags.set(SampleFlags::SENSOR_FAULT);
                self.last_th
            }
        };

        let t_mcu_c = self.sensors.read_mcu_temp();
        let vin_v = self.sensors.read_supply_voltage();
        let door = self.sensors.read_door();

        if door {
            flags.set(SampleFlags::DOOR_OPEN);
        }
        if vin_v < self.config.vin_low_v {
            flags.set(SampleFlags::VIN_LOW);
        }

        Sample {
            t_c,
            t_mcu_c,
            rh_pct,
            vin_v,
            door,
            flags,
            ts_ms: self.boot.elapsed().as_millis() as u32,
        }
    }
}

/// Next phase-locked deadline after `prev` fires.
///
/// Deadlines the task slept through are skipped, not replayed: a stall
/// longer than one period yields a single catch-up sample on the original
/// phase, never a burst of back-to-back samples.
fn next_deadline(prev: Instant, now: Instant, period: Duration) -> Instant {
    let mut next = prev + period;
    while next <= now {
        next += period;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim_sensors::{FixedPoint, SimSensors};
    use crate::channels::{sample_channel, wake_signal};

    fn task(sensors: SimSensors) -> (AcquisitionTask<SimSensors>, Sender<()>) {
        let (tx, _rx) = sample_channel();
        let (wake_tx, wake_rx) = wake_signal();
        let t = AcquisitionTask::new(
            sensors,
            SystemConfig::default(),
            tx,
            wake_rx,
            Arc::new(PipelineCounters::new()),
        );
        (t, wake_tx)
    }

    #[test]
    fn nominal_sample_has_no_flags() {
        let sensors = SimSensors::new();
        sensors.control().set_fixed(FixedPoint {
            t_c: 3.0,
            rh_pct: 60.0,
            vin_v: 24.0,
            door_open: false,
        });
        let (mut t, _wake) = task(sensors);
        let s = t.acquire_once();
        assert_eq!(s.t_c, 3.0);
        assert!(s.flags.is_empty());
        assert!(!s.door);
    }

    #[test]
    fn door_and_low_vin_are_stamped() {
        let sensors = SimSensors::new();
        sensors.control().set_fixed(FixedPoint {
            t_c: 3.0,
            rh_pct: 60.0,
            vin_v: 11.5,
            door_open: true,
        });
        let (mut t, _wake) = task(sensors);
        let s = t.acquire_once();
        assert!(s.flags.contains(SampleFlags::DOOR_OPEN));
        assert!(s.flags.contains(SampleFlags::VIN_LOW));
        assert!(s.door);
    }

    #[test]
    fn sensor_fault_flags_and_reuses_last_good() {
        let sensors = SimSensors::new();
        let control = sensors.control();
        control.set_fixed(FixedPoint {
            t_c: 2.5,
            rh_pct: 58.0,
            vin_v: 24.0,
            door_open: false,
        });
        let (mut t, _wake) = task(sensors);

        // Healthy read establishes the fallback pair.
        let good = t.acquire_once();
        assert!(good.flags.is_empty());

        control.set_th_fault(true);
        let faulted = t.acquire_once();
        assert!(faulted.flags.contains(SampleFlags::SENSOR_FAULT));
        assert_eq!(faulted.t_c, 2.5, "fault reuses prior temperature");
        assert_eq!(faulted.rh_pct, 58.0);
    }

    #[test]
    fn fault_before_any_good_read_defaults_to_zero() {
        let sensors = SimSensors::new();
        sensors.control().set_th_fault(true);
        let (mut t, _wake) = task(sensors);
        let s = t.acquire_once();
        assert!(s.flags.contains(SampleFlags::SENSOR_FAULT));
        assert_eq!(s.t_c, 0.0);
        assert_eq!(s.rh_pct, 0.0);
    }

    #[test]
    fn on_time_wakeup_advances_one_period() {
        let t0 = Instant::now();
        let period = Duration::from_millis(100);
        // Fired right on the deadline: next fire is one period out.
        assert_eq!(next_deadline(t0, t0, period), t0 + period);
    }

    #[test]
    fn missed_deadlines_are_skipped_not_replayed() {
        let t0 = Instant::now();
        let period = Duration::from_millis(100);
        // Stalled for 3.5 periods: the next fire is the 4th tick on the
        // original phase, with no catch-up burst in between.
        let now = t0 + Duration::from_millis(350);
        assert_eq!(
            next_deadline(t0, now, period),
            t0 + Duration::from_millis(400)
        );
    }

    #[test]
    fn timestamps_are_monotonic() {
        let sensors = SimSensors::new();
        let (mut t, _wake) = task(sensors);
        let a = t.acquire_once();
        let b = t.acquire_once();
        assert!(b.ts_ms >= a.ts_ms);
    }
}
