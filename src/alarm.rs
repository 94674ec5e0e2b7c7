//! Alarm and relay decision machines.
//!
//! Two independent state machines, both owned and mutated only by the
//! processing task:
//!
//! * [`AlarmMonitor`] — promotes a continuously out-of-range temperature
//!   to an alarm after a dwell period, and clears it only once the
//!   temperature re-enters the inner hysteresis band. Dwell debounces door
//!   openings and defrost transients; asymmetric re-entry prevents chatter
//!   at the boundary.
//! * [`RelayLatch`] — drives the cooling relay from instantaneous
//!   temperature alone. No dwell: cooling must not wait for alarm
//!   confirmation, and its latch is deliberately decoupled from alarm
//!   state.
//!
//! ```text
//!        t > high+hyst                    out of [low, high] for ≥ dwell
//! relay ─────────────▶ ON        Normal ───▶ Pending ───▶ AlarmActive
//! relay ◀───────────── OFF       Normal ◀─── Pending      │
//!        t < high−hyst           Normal ◀──────────────────┘
//!                                   t within [low+hyst, high−hyst]
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::telemetry::SampleFlags;

// ───────────────────────────────────────────────────────────────
// Alarm state machine
// ───────────────────────────────────────────────────────────────

/// Alarm lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// Temperature in range, no alarm.
    Normal,
    /// Out of range; dwell timer running since the recorded timestamp.
    OutOfRangePending { since_ms: u32 },
    /// Alarm confirmed; clears only inside the hysteresis band.
    AlarmActive,
}

/// Dwell/hysteresis alarm monitor.
pub struct AlarmMonitor {
    high_c: f32,
    low_c: f32,
    hyst_c: f32,
    dwell_ms: u32,
    state: AlarmState,
}

impl AlarmMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            high_c: config.temp_high_c,
            low_c: config.temp_low_c,
            hyst_c: config.temp_hyst_c,
            dwell_ms: config.alarm_dwell_ms,
            state: AlarmState::Normal,
        }
    }

    /// Feed one sample; returns the alarm stamp bits for it.
    ///
    /// While the alarm is active, the stamp carries ALARM_HIGH or
    /// ALARM_LOW depending on which bound the current temperature
    /// violates; inside the outer band (alarm still latched) neither
    /// bit is stamped.
    pub fn update(&mut self, t_c: f32, ts_ms: u32) -> SampleFlags {
        if self.out_of_range(t_c) {
            match self.state {
                AlarmState::Normal => {
                    self.state = AlarmState::OutOfRangePending { since_ms: ts_ms };
                }
                AlarmState::OutOfRangePending { since_ms } => {
                    // Wrapping arithmetic: ts_ms rolls over after ~49 days.
                    if ts_ms.wrapping_sub(since_ms) >= self.dwell_ms {
                        warn!(
                            "ALARM SET: t={t_c:.2}°C outside [{:.1}, {:.1}] for {} ms",
                            self.low_c, self.high_c, self.dwell_ms
                        );
                        self.state = AlarmState::AlarmActive;
                    }
                }
                AlarmState::AlarmActive => {}
            }
        } else {
            match self.state {
                AlarmState::OutOfRangePending { .. } => {
                    // Re-entry before the dwell elapsed: never alarmed.
                    self.state = AlarmState::Normal;
                }
                AlarmState::AlarmActive if self.back_in_band(t_c) => {
                    info!("ALARM CLEARED: t={t_c:.2}°C back inside hysteresis band");
                    self.state = AlarmState::Normal;
                }
                _ => {}
            }
        }

        self.stamp(t_c)
    }

    /// True once the dwell has confirmed the alarm.
    pub fn is_active(&self) -> bool {
        matches!(self.state, AlarmState::AlarmActive)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AlarmState {
        self.state
    }

    // ── Internal ──────────────────────────────────────────────

    fn out_of_range(&self, t_c: f32) -> bool {
        t_c > self.high_c || t_c < self.low_c
    }

    fn back_in_band(&self, t_c: f32) -> bool {
        t_c <= self.high_c - self.hyst_c && t_c >= self.low_c + self.hyst_c
    }

    fn stamp(&self, t_c: f32) -> SampleFlags {
        let mut flags = SampleFlags::NONE;
        if self.is_active() {
            if t_c > self.high_c {
                flags.set(SampleFlags::ALARM_HIGH);
            }
            if t_c < self.low_c {
                flags.set(SampleFlags::ALARM_LOW);
            }
        }
        flags
    }
}

// ───────────────────────────────────────────────────────────────
// Relay latch
// ───────────────────────────────────────────────────────────────

/// Two-state cooling-relay latch.
///
/// Turns on above `high + hyst`, off below `high − hyst`. Reacts to the
/// instantaneous temperature only — dwell time and alarm state never
/// enter the decision.
pub struct RelayLatch {
    on_above_c: f32,
    off_below_c: f32,
    latched: bool,
}

impl RelayLatch {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            on_above_c: config.temp_high_c + config.temp_hyst_c,
            off_below_c: config.temp_high_c - config.temp_hyst_c,
            latched: false,
        }
    }

    /// Feed one temperature; returns the wanted relay state.
    pub fn update(&mut self, t_c: f32) -> bool {
        if !self.latched && t_c > self.on_above_c {
            self.latched = true;
        } else if self.latched && t_c < self.off_below_c {
            self.latched = false;
        }
        self.latched
    }

    /// Current latch state.
    pub fn is_on(&self) -> bool {
        self.latched
    }
}
