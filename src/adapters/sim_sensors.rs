//! Simulated sensor bank.
//!
//! Pluggable data source behind the same `SensorPort` contract as the
//! live I2C/ADC/GPIO drivers. Two modes, mirroring the node's SIM build:
//! a fixed operating point (set it, and every read returns it) or a slow
//! drifting ramp that sweeps the temperature through both relay
//! thresholds and back. Fault injection makes the temp/humidity read
//! fail so the sensor-fault path gets exercised end to end.

use std::sync::{Arc, Mutex};

use crate::error::SensorError;
use crate::ports::SensorPort;

#[derive(Debug, Clone, Copy)]
struct SimState {
    fixed: Option<FixedPoint>,
    fail_th_read: bool,
    // Ramp state.
    ramp_t_c: f32,
    ramp_rh_pct: f32,
}

/// A pinned operating point for deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedPoint {
    pub t_c: f32,
    pub rh_pct: f32,
    pub vin_v: f32,
    pub door_open: bool,
}

/// Control handle shared with tests / the driving harness.
#[derive(Clone)]
pub struct SimControl {
    state: Arc<Mutex<SimState>>,
}

impl SimControl {
    /// Pin all reads to a fixed operating point.
    pub fn set_fixed(&self, point: FixedPoint) {
        self.lock().fixed = Some(point);
    }

    /// Return to the drifting ramp profile.
    pub fn clear_fixed(&self) {
        self.lock().fixed = None;
    }

    /// Make the next temp/humidity reads fail (until cleared).
    pub fn set_th_fault(&self, fail: bool) {
        self.lock().fail_th_read = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state lock poisoned")
    }
}

/// Simulated sensor bank implementing [`SensorPort`].
pub struct SimSensors {
    state: Arc<Mutex<SimState>>,
}

impl SimSensors {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                fixed: None,
                fail_th_read: false,
                ramp_t_c: 3.5,
                ramp_rh_pct: 65.0,
            })),
        }
    }

    /// Control handle for steering the simulation from another thread.
    pub fn control(&self) -> SimControl {
        SimControl {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimSensors {
    fn read_temp_humidity(&mut self) -> Result<(f32, f32), SensorError> {
        let mut s = self.state.lock().expect("sim state lock poisoned");
        if s.fail_th_read {
            return Err(SensorError::BusReadFailed);
        }
        if let Some(p) = s.fixed {
            return Ok((p.t_c, p.rh_pct));
        }
        // Slow ramp: sweeps past high+hyst and back below high−hyst.
        s.ramp_t_c += 0.02;
        if s.ramp_t_c > 6.5 {
            s.ramp_t_c = 3.0;
        }
        s.ramp_rh_pct += 0.10;
        if s.ramp_rh_pct > 80.0 {
            s.ramp_rh_pct = 55.0;
        }
        Ok((s.ramp_t_c, s.ramp_rh_pct))
    }

    fn read_mcu_temp(&mut self) -> f32 {
        35.0
    }

    fn read_supply_voltage(&mut self) -> f32 {
        let s = self.state.lock().expect("sim state lock poisoned");
        s.fixed.map_or(24.0, |p| p.vin_v)
    }

    fn read_door(&mut self) -> bool {
        let s = self.state.lock().expect("sim state lock poisoned");
        s.fixed.is_some_and(|p| p.door_open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_overrides_ramp() {
        let mut sim = SimSensors::new();
        sim.control().set_fixed(FixedPoint {
            t_c: 5.5,
            rh_pct: 70.0,
            vin_v: 12.0,
            door_open: true,
        });
        assert_eq!(sim.read_temp_humidity().unwrap(), (5.5, 70.0));
        assert_eq!(sim.read_supply_voltage(), 12.0);
        assert!(sim.read_door());
    }

    #[test]
    fn ramp_wraps_within_bounds() {
        let mut sim = SimSensors::new();
        for _ in 0..500 {
            let (t, rh) = sim.read_temp_humidity().unwrap();
            assert!((3.0..=6.52).contains(&t));
            assert!((55.0..=80.1).contains(&rh));
        }
    }

    #[test]
    fn injected_fault_fails_th_read_only() {
        let mut sim = SimSensors::new();
        sim.control().set_th_fault(true);
        assert!(sim.read_temp_humidity().is_err());
        // ADC/GPIO reads still deliver.
        assert_eq!(sim.read_mcu_temp(), 35.0);
        sim.control().set_th_fault(false);
        assert!(sim.read_temp_humidity().is_ok());
    }
}
