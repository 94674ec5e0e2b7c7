//! Property tests for the control-law state machines and the log ring.
//!
//! The alarm monitor and relay latch are pure functions of the sample
//! stream, so they get model-based checks over arbitrary temperature
//! trajectories. The logger gets push/flush sequences with injected
//! storage failures.

use coldchain::adapters::mem_fram::MemFram;
use coldchain::alarm::{AlarmMonitor, RelayLatch};
use coldchain::config::SystemConfig;
use coldchain::logger::Logger;
use coldchain::ports::{FRAM_LOG_BASE, FramPort};
use coldchain::telemetry::{SAMPLE_RECORD_BYTES, Sample, SampleFlags};
use proptest::prelude::*;

fn config() -> SystemConfig {
    SystemConfig::default()
}

/// A temperature trajectory: per-step reading plus elapsed time.
fn arb_trajectory() -> impl Strategy<Value = Vec<(f32, u32)>> {
    proptest::collection::vec((-10.0f32..15.0f32, 1u32..=2_000u32), 1..=64)
}

fn sample_at(t_c: f32, ts_ms: u32) -> Sample {
    Sample {
        t_c,
        ts_ms,
        ..Sample::default()
    }
}

// ── relay latch ──────────────────────────────────────────────

proptest! {
    /// For any trajectory the latch state equals a fold of the two
    /// thresholds: on above high + hyst, off below high − hyst, held
    /// in between. No history beyond the current state matters.
    #[test]
    fn relay_latch_is_a_threshold_fold(steps in arb_trajectory()) {
        let cfg = config();
        let mut latch = RelayLatch::new(&cfg);

        let on_above = cfg.temp_high_c + cfg.temp_hyst_c;
        let off_below = cfg.temp_high_c - cfg.temp_hyst_c;
        let mut model = false;

        for (t_c, _) in steps {
            let got = latch.update(t_c);
            if t_c > on_above {
                model = true;
            } else if t_c < off_below {
                model = false;
            }
            prop_assert_eq!(got, model, "latch diverged from model at {} degC", t_c);
        }
    }
}

// ── alarm monitor ────────────────────────────────────────────

proptest! {
    /// Temperatures that never leave [low, high] must never alarm and
    /// must never stamp an alarm flag.
    #[test]
    fn in_band_trajectories_never_alarm(steps in arb_trajectory()) {
        let cfg = config();
        let mut monitor = AlarmMonitor::new(&cfg);
        let span = cfg.temp_high_c - cfg.temp_low_c;

        let mut ts_ms = 0u32;
        for (raw, dt) in steps {
            // Squash the raw reading into the safe band.
            let t_c = cfg.temp_low_c + (raw.abs() % span.max(f32::EPSILON)).min(span);
            ts_ms = ts_ms.wrapping_add(dt);
            let flags = monitor.update(t_c, ts_ms);
            prop_assert!(!monitor.is_active());
            prop_assert!(!flags.contains(SampleFlags::ALARM_HIGH));
            prop_assert!(!flags.contains(SampleFlags::ALARM_LOW));
        }
    }

    /// A single excursion whose total duration is under the dwell never
    /// activates, however hot it gets.
    #[test]
    fn short_excursions_never_activate(
        t_c in 4.1f32..50.0f32,
        splits in proptest::collection::vec(1u32..=1_000u32, 1..=10),
    ) {
        let cfg = config();
        let mut monitor = AlarmMonitor::new(&cfg);

        // Scale the step pattern so the excursion stays under the dwell.
        let total: u32 = splits.iter().sum();
        let budget = cfg.alarm_dwell_ms.saturating_sub(1);

        let mut ts_ms = 0u32;
        for dt in &splits {
            ts_ms += dt * budget / total.max(1) / splits.len().max(1) as u32;
            monitor.update(t_c, ts_ms);
            prop_assert!(!monitor.is_active(), "activated {} ms into the dwell", ts_ms);
        }
    }

    /// Alarm flags are only ever stamped while the monitor is active.
    #[test]
    fn alarm_flags_imply_active(steps in arb_trajectory()) {
        let cfg = config();
        let mut monitor = AlarmMonitor::new(&cfg);

        let mut ts_ms = 0u32;
        for (t_c, dt) in steps {
            ts_ms = ts_ms.wrapping_add(dt);
            let flags = monitor.update(t_c, ts_ms);
            if flags.contains(SampleFlags::ALARM_HIGH) || flags.contains(SampleFlags::ALARM_LOW) {
                prop_assert!(monitor.is_active());
            }
        }
    }

    /// Once active, the alarm holds until a reading lands inside the
    /// hysteresis-narrowed clear band. Deadband readings never release it.
    #[test]
    fn active_alarm_holds_outside_clear_band(steps in arb_trajectory()) {
        let cfg = config();
        let mut monitor = AlarmMonitor::new(&cfg);

        // Drive it active first: hot for a full dwell.
        monitor.update(cfg.temp_high_c + 5.0, 0);
        monitor.update(cfg.temp_high_c + 5.0, cfg.alarm_dwell_ms);
        prop_assert!(monitor.is_active());

        let clear_lo = cfg.temp_low_c + cfg.temp_hyst_c;
        let clear_hi = cfg.temp_high_c - cfg.temp_hyst_c;

        let mut ts_ms = cfg.alarm_dwell_ms;
        let mut active = true;
        for (t_c, dt) in steps {
            ts_ms = ts_ms.wrapping_add(dt);
            monitor.update(t_c, ts_ms);
            let in_clear_band = (clear_lo..=clear_hi).contains(&t_c);
            if active && !in_clear_band {
                prop_assert!(monitor.is_active(), "released at {} degC outside the clear band", t_c);
            }
            active = monitor.is_active();
        }
    }
}

// ── logger ───────────────────────────────────────────────────

proptest! {
    /// Across any interleaving of pushes and flushes, with a storage
    /// fault injected partway through, every record that reaches FRAM
    /// appears in push order and nothing is double-written.
    #[test]
    fn flush_preserves_order_across_failures(
        batches in proptest::collection::vec(1usize..=6, 1..=8),
        fail_budget in 0u32..=20u32,
    ) {
        let mut logger: Logger<16> = Logger::new();
        let mut fram = MemFram::new();
        fram.fail_after(fail_budget);

        let mut seq = 0u32;
        let mut pushed = Vec::new();
        for batch in batches {
            for _ in 0..batch {
                let s = sample_at(2.0, seq);
                if logger.push(s).is_ok() {
                    pushed.push(s);
                }
                seq += 1;
            }
            // A failed flush keeps the unwritten tail queued.
            let _ = logger.flush(&mut fram);
        }

        // Lift the fault and drain whatever survived in the ring.
        fram.fail_after(u32::MAX);
        logger.flush(&mut fram).expect("final drain");

        let written = fram.write_count() as usize;
        prop_assert!(written <= pushed.len());
        for (i, expected) in pushed.iter().take(written).enumerate() {
            let addr = FRAM_LOG_BASE + (i * SAMPLE_RECORD_BYTES) as u32;
            let slot = fram.read(addr, SAMPLE_RECORD_BYTES).unwrap();
            let got = Sample::from_record(&slot).expect("committed record decodes");
            prop_assert_eq!(got.ts_ms, expected.ts_ms, "slot {} out of order", i);
        }
    }

    /// The ring never holds more than its capacity; overflow drops the
    /// newest sample and reports it.
    #[test]
    fn ring_occupancy_is_bounded(count in 0usize..=40) {
        let mut logger: Logger<16> = Logger::new();
        let mut accepted = 0usize;
        for i in 0..count {
            if logger.push(sample_at(2.0, i as u32)).is_ok() {
                accepted += 1;
            }
        }
        prop_assert!(logger.count() <= 16);
        prop_assert_eq!(accepted, count.min(16));
    }
}
