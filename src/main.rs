//! Cold-chain node — simulation entry point.
//!
//! Wires the full pipeline against the simulated sensor bank, relay and
//! FRAM, then sits in the telemetry consumer's seat: draining the event
//! channel and logging flag words and bus state the way the CAN/CLI
//! tasks would on the real node.
//!
//! ```text
//! SimSensors ─▶ Acquisition ─▶ Sample Channel ─▶ Processing ─▶ MemFram
//!                                   │               │  │
//!                 Commit Timer ─▶ EventBus ◀────────┘  └─▶ Event Channel
//!                                   │                           │
//!                                (this main: monitor loop) ◀────┘
//! ```

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use coldchain::adapters::mem_fram::MemFram;
use coldchain::adapters::sim_relay::SimRelay;
use coldchain::adapters::sim_sensors::SimSensors;
use coldchain::bus::SysFlags;
use coldchain::config::SystemConfig;
use coldchain::telemetry::SampleFlags;
use coldchain::wiring::Node;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SystemConfig::default();
    info!(
        "cold-chain node v{} — band [{:.1}, {:.1}] °C, dwell {} ms, commit {} ms",
        env!("CARGO_PKG_VERSION"),
        config.temp_low_c,
        config.temp_high_c,
        config.alarm_dwell_ms,
        config.commit_ms,
    );

    let sensors = SimSensors::new();
    let relay = SimRelay::new();
    let relay_probe = relay.probe();
    let fram = MemFram::new();

    let node = Node::bring_up(config, sensors, relay, fram)?;
    info!("pipeline up; streaming simulated profile");

    // Telemetry consumer: drain flag words, mirror bus state, watch drops.
    let bus = node.bus();
    let mut last_word = u32::MAX;
    loop {
        match node.events().recv_timeout(Duration::from_secs(5)) {
            Ok(word) => {
                if word != last_word {
                    let flags = SampleFlags(word);
                    let sample = node.last_sample();
                    info!(
                        "t={:.2}°C rh={:.1}% vin={:.1}V flags=[{}] bus=[{}] relay={}",
                        sample.t_c,
                        sample.rh_pct,
                        sample.vin_v,
                        flags,
                        bus.get(),
                        if relay_probe.is_on() { "ON" } else { "off" },
                    );
                    last_word = word;
                }
            }
            Err(_) => {
                warn!("no telemetry for 5 s; nudging the pipeline");
                node.force_reeval();
                node.request_immediate_sample();
            }
        }

        let drops = node.counters();
        if drops.flush_failures > 0 {
            warn!("storage degraded: {} flush failures so far", drops.flush_failures);
        }
        if bus.get().contains(SysFlags::ALARM_ACTIVE | SysFlags::DOOR_OPEN) {
            warn!("alarm active with door open");
        }
    }
}
