//! A deterministic data-frame generator used for emulation and testing: a
//! `Source` loads a configuration and can be asked to fill in a data frame at
//! the current time; `StableSource` always returns the same measurement
//! values it was seeded with, only advancing the timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::time_quality_code;
use crate::config::Config;
use crate::data_codec::PmuDataFrame;
use crate::error::JsonBridgeError;
use crate::json_bridge::{load_config, load_data_file};

/// Something that can supply a configuration and stamp data frames against
/// the current time.
pub trait Source {
    fn load_config(&mut self, text: &str) -> Result<(), JsonBridgeError>;
    fn config(&self) -> &Config;
    fn fill_data_frame(&self, now: SystemTime) -> PmuDataFrame;
}

/// Compute the `(soc, fracsec)` pair for wall-clock time `now`, with the
/// fractional-second word scaled by `time_base` and tagged with the time
/// quality code matching `tolerance`.
pub fn generate_time_codes(now: SystemTime, time_base: u32, tolerance: f64) -> (u32, u32) {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let soc = since_epoch.as_secs() as u32;
    let frac_seconds = since_epoch.subsec_nanos() as f64 / 1e9;
    let scaled = ((frac_seconds * time_base as f64) as u32) & 0x00FF_FFFF;
    let fracsec = scaled | ((time_quality_code(tolerance) as u32) << 24);
    (soc, fracsec)
}

/// A source whose measurement values never change between calls; only the
/// timestamp fields of the seeded frame are refreshed.
pub struct StableSource {
    config: Config,
    seed: PmuDataFrame,
    tolerance: f64,
}

impl StableSource {
    pub fn new() -> Self {
        StableSource {
            config: Config::default(),
            seed: PmuDataFrame::default(),
            tolerance: 1e-6,
        }
    }

    /// Load both the roster (`config` member) and, if present, a seed data
    /// frame from the JSON document's `default` or `data` member.
    pub fn load_config_and_seed(&mut self, text: &str) -> Result<(), JsonBridgeError> {
        self.config = load_config(text)?;
        let root: serde_json::Value = serde_json::from_str(text)?;
        let base = root.get("config").unwrap_or(&root);
        if let Some(seed_value) = base.get("default").or_else(|| base.get("data")) {
            let seed_text = serde_json::to_string(seed_value)?;
            self.seed = load_data_file(&seed_text)?;
        } else {
            self.seed = default_seed(&self.config);
        }
        Ok(())
    }
}

impl Default for StableSource {
    fn default() -> Self {
        Self::new()
    }
}

fn default_seed(config: &Config) -> PmuDataFrame {
    PmuDataFrame {
        idcode: config.idcode,
        pmus: config
            .pmus
            .iter()
            .map(|pmu| crate::data_codec::PmuData {
                stat: 0,
                phasors: vec![num_complex::Complex64::new(0.0, 0.0); pmu.phasor_count() as usize],
                freq: pmu.nominal_frequency as f64,
                rocof: 0.0,
                analog: vec![0.0; pmu.analog_count() as usize],
                digital: vec![0; pmu.digital_word_count() as usize],
            })
            .collect(),
        ..PmuDataFrame::default()
    }
}

impl Source for StableSource {
    fn load_config(&mut self, text: &str) -> Result<(), JsonBridgeError> {
        self.load_config_and_seed(text)
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn fill_data_frame(&self, now: SystemTime) -> PmuDataFrame {
        let mut frame = self.seed.clone();
        frame.idcode = self.config.idcode;
        let (soc, fracsec) = generate_time_codes(now, self.config.time_base, self.tolerance);
        frame.soc = soc;
        frame.time_quality = (fracsec >> 24) as u8;
        frame.frac_sec = (fracsec & 0x00FF_FFFF) as f64 / self.config.time_base as f64;
        frame
    }
}
