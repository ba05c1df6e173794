//! Data frame parsing and generation. The per-PMU payload layout depends on
//! the format flags recorded in the matching `PmuConfig`, so every function
//! here takes a `&Config` alongside the buffer.

use num_complex::Complex64;

use crate::common::{parse_common, write_common_header, write_crc, write_size, write_time, FrameType};
use crate::config::{Config, DataFormat, PhasorCoordinates, PmuConfig};
use crate::error::ParseResult;
use crate::primitives::{
    read_f32_be, read_i16_be, read_u16_be, write_f32_be, write_i16_be, write_u16_be,
};

/// One PMU's worth of measurements within a data frame.
#[derive(Debug, Clone, Default)]
pub struct PmuData {
    pub stat: u16,
    pub phasors: Vec<Complex64>,
    pub freq: f64,
    pub rocof: f64,
    pub analog: Vec<f64>,
    pub digital: Vec<u16>,
}

/// A full data frame: common header fields plus one [`PmuData`] per PMU in
/// the roster the frame was parsed against.
#[derive(Debug, Clone)]
pub struct PmuDataFrame {
    pub idcode: u16,
    pub soc: u32,
    pub frac_sec: f64,
    pub time_quality: u8,
    pub pmus: Vec<PmuData>,
    pub parse_result: ParseResult,
}

impl Default for PmuDataFrame {
    fn default() -> Self {
        PmuDataFrame {
            idcode: 0,
            soc: 0,
            frac_sec: 0.0,
            time_quality: 0,
            pmus: Vec::new(),
            parse_result: ParseResult::NotParsed,
        }
    }
}

fn phasor_sample_size(pmu: &PmuConfig) -> usize {
    if pmu.phasor_format == DataFormat::FloatingPoint {
        8
    } else {
        4
    }
}

fn scalar_sample_size(format: DataFormat) -> usize {
    if format == DataFormat::FloatingPoint {
        4
    } else {
        2
    }
}

fn pmu_data_size(pmu: &PmuConfig) -> usize {
    2 + phasor_sample_size(pmu) * pmu.phasor_count() as usize
        + 2 * scalar_sample_size(pmu.freq_format)
        + scalar_sample_size(pmu.analog_format) * pmu.analog_count() as usize
        + 2 * pmu.digital_word_count() as usize
}

/// Total frame size (common header + CRC trailer included) an emission
/// against `config`'s full roster will produce.
pub fn expected_data_size(config: &Config) -> usize {
    16 + config.pmus.iter().map(pmu_data_size).sum::<usize>()
}

fn parse_pmu_data(data: &[u8], pmu: &PmuConfig) -> (PmuData, usize) {
    let mut out = PmuData::default();
    let mut used = 0usize;

    out.stat = read_u16_be(data, used);
    used += 2;

    for _ in 0..pmu.phasor_count() {
        let phasor = if pmu.phasor_format == DataFormat::FloatingPoint {
            let a = read_f32_be(data, used) as f64;
            let b = read_f32_be(data, used + 4) as f64;
            used += 8;
            match pmu.phasor_coordinates {
                PhasorCoordinates::Rectangular => Complex64::new(a, b),
                PhasorCoordinates::Polar => Complex64::from_polar(a, b),
            }
        } else {
            match pmu.phasor_coordinates {
                PhasorCoordinates::Rectangular => {
                    let real = read_i16_be(data, used) as f64;
                    let imag = read_i16_be(data, used + 2) as f64;
                    used += 4;
                    Complex64::new(real * 1e-5, imag * 1e-5)
                }
                PhasorCoordinates::Polar => {
                    let mag = read_u16_be(data, used) as f64;
                    let angle = read_i16_be(data, used + 2) as f64 / 1e4;
                    used += 4;
                    Complex64::from_polar(mag * 1e-5, angle)
                }
            }
        };
        out.phasors.push(phasor);
    }

    // Scale by the channel's conversion factor (integer formats only; the
    // factor is already baked into the physical value for float formats).
    if pmu.phasor_format == DataFormat::Integer {
        for (phasor, conv) in out.phasors.iter_mut().zip(pmu.phasor_conversion.iter()) {
            *phasor *= *conv as f64;
        }
    }

    if pmu.freq_format == DataFormat::FloatingPoint {
        out.freq = read_f32_be(data, used) as f64;
        out.rocof = read_f32_be(data, used + 4) as f64;
        used += 8;
    } else {
        out.freq = read_i16_be(data, used) as f64 / 1000.0;
        out.rocof = read_i16_be(data, used + 2) as f64 / 1000.0;
        used += 4;
    }

    for _ in 0..pmu.analog_count() {
        let value = if pmu.analog_format == DataFormat::FloatingPoint {
            let v = read_f32_be(data, used) as f64;
            used += 4;
            v
        } else {
            let v = read_i16_be(data, used) as f64;
            used += 2;
            v
        };
        out.analog.push(value);
    }

    for _ in 0..pmu.digital_word_count() {
        out.digital.push(read_u16_be(data, used));
        used += 2;
    }

    (out, used)
}

/// Parse a data frame against `config`. Always returns a frame (never bare
/// `Err`): outcome is carried in `parse_result`, since a data frame whose
/// `idcode` doesn't match the config is still meaningful to the caller
/// (`IdMismatch` is advisory, not fatal).
pub fn parse_data_frame(data: &[u8], config: &Config) -> PmuDataFrame {
    let mut out = PmuDataFrame::default();

    let frame = match parse_common(data) {
        Ok(f) => f,
        Err(e) => {
            out.parse_result = e;
            return out;
        }
    };
    if frame.frame_type != FrameType::Data {
        out.parse_result = ParseResult::IncorrectType;
        return out;
    }

    out.idcode = frame.source_id;
    out.soc = frame.soc;
    out.time_quality = (frame.frac_sec >> 24) as u8;
    out.frac_sec = (frame.frac_sec & 0x00FF_FFFF) as f64 / config.time_base as f64;
    out.pmus = vec![PmuData::default(); config.pmus.len()];

    if frame.source_id != config.idcode {
        log::info!(
            "parse_data_frame: source id {} does not match configured idcode {}",
            frame.source_id,
            config.idcode
        );
        out.parse_result = ParseResult::IdMismatch;
    } else {
        out.parse_result = ParseResult::ParseComplete;
    }

    let needed = expected_data_size(config);
    if data.len() < needed {
        log::warn!("parse_data_frame: payload shorter than config expects ({needed} bytes)");
        out.parse_result = ParseResult::ConfigMismatch;
        return out;
    }

    let mut used = crate::common::COMMON_FRAME_SIZE;
    for (slot, pmu) in out.pmus.iter_mut().zip(config.pmus.iter()) {
        let (parsed, consumed) = parse_pmu_data(&data[used..], pmu);
        *slot = parsed;
        used += consumed;
    }

    out
}

fn generate_pmu_data(dst: &mut [u8], pmu: &PmuConfig, data: &PmuData) -> usize {
    let mut used = 0usize;
    write_u16_be(dst, used, data.stat);
    used += 2;

    for (index, phasor) in data.phasors.iter().enumerate() {
        let conv = pmu.phasor_conversion.get(index).copied().unwrap_or(1) as f64;
        if pmu.phasor_format == DataFormat::FloatingPoint {
            match pmu.phasor_coordinates {
                PhasorCoordinates::Rectangular => {
                    write_f32_be(dst, used, phasor.re as f32);
                    write_f32_be(dst, used + 4, phasor.im as f32);
                }
                PhasorCoordinates::Polar => {
                    write_f32_be(dst, used, phasor.norm() as f32);
                    write_f32_be(dst, used + 4, phasor.arg() as f32);
                }
            }
            used += 8;
        } else {
            match pmu.phasor_coordinates {
                PhasorCoordinates::Rectangular => {
                    let real = (phasor.re * 1e5 / conv) as i16;
                    let imag = (phasor.im * 1e5 / conv) as i16;
                    write_i16_be(dst, used, real);
                    write_i16_be(dst, used + 2, imag);
                }
                PhasorCoordinates::Polar => {
                    let mag = (phasor.norm() * 1e5 / conv) as u16;
                    let angle = (phasor.arg() * 1e4) as i16;
                    write_u16_be(dst, used, mag);
                    write_i16_be(dst, used + 2, angle);
                }
            }
            used += 4;
        }
    }

    if pmu.freq_format == DataFormat::FloatingPoint {
        write_f32_be(dst, used, data.freq as f32);
        write_f32_be(dst, used + 4, data.rocof as f32);
        used += 8;
    } else {
        write_i16_be(dst, used, (data.freq * 1000.0) as i16);
        write_i16_be(dst, used + 2, (data.rocof * 1000.0) as i16);
        used += 4;
    }

    for value in &data.analog {
        if pmu.analog_format == DataFormat::FloatingPoint {
            write_f32_be(dst, used, *value as f32);
            used += 4;
        } else {
            write_i16_be(dst, used, *value as i16);
            used += 2;
        }
    }

    for word in &data.digital {
        write_u16_be(dst, used, *word);
        used += 2;
    }

    used
}

/// Emit a data frame. `frame.pmus` must line up 1:1 with `config.pmus`.
pub fn generate_data_frame(dst: &mut [u8], config: &Config, frame: &PmuDataFrame) -> usize {
    let needed = expected_data_size(config).max(crate::common::MIN_PACKET_SIZE);
    if dst.len() < needed || frame.pmus.len() != config.pmus.len() {
        return 0;
    }
    write_common_header(dst, config.idcode, FrameType::Data).unwrap();

    let scaled_frac = ((frame.frac_sec * config.time_base as f64) as u32) & 0x00FF_FFFF;
    let frac_word = scaled_frac | ((frame.time_quality as u32) << 24);
    write_time(dst, frame.soc, frac_word);

    let mut used = crate::common::COMMON_FRAME_SIZE;
    for (pmu, data) in config.pmus.iter().zip(frame.pmus.iter()) {
        used += generate_pmu_data(&mut dst[used..], pmu, data);
    }
    used += 2; // trailing CRC
    write_size(dst, used as u16);
    write_crc(dst, used as u16);
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalogType, PhasorType};

    fn sample_config() -> Config {
        let mut pmu = PmuConfig::default();
        pmu.source_id = 1;
        pmu.phasor_names = vec!["VA".into(), "VB".into()];
        pmu.phasor_type = vec![PhasorType::Voltage, PhasorType::Voltage];
        // conversion factor of 100_000 makes raw-count <-> physical-value
        // scaling an identity for integer inputs (physical = raw*1e-5*conv).
        pmu.phasor_conversion = vec![100_000, 100_000];
        pmu.analog_names = vec!["P".into()];
        pmu.analog_type = vec![AnalogType::Rms];
        pmu.analog_conversion = vec![1];
        pmu.digital_channel_names = (0..16).map(|i| format!("d{i}")).collect();
        pmu.digital_nominal = vec![0];
        pmu.digital_active = vec![0];
        pmu.phasor_format = DataFormat::Integer;
        pmu.freq_format = DataFormat::Integer;
        pmu.analog_format = DataFormat::Integer;
        pmu.phasor_coordinates = PhasorCoordinates::Rectangular;

        Config {
            idcode: 42,
            data_rate: 30,
            soc: 0,
            fracsec: 0,
            time_base: 1_000_000,
            pmus: vec![pmu],
        }
    }

    fn sample_frame(config: &Config) -> PmuDataFrame {
        let mut pmu_data = PmuData::default();
        pmu_data.stat = 0;
        pmu_data.phasors = vec![Complex64::new(12000.0, -500.0), Complex64::new(0.0, 11000.0)];
        pmu_data.freq = 60.01;
        pmu_data.rocof = 0.1;
        pmu_data.analog = vec![123.0];
        pmu_data.digital = vec![0xFFFF];
        PmuDataFrame {
            idcode: config.idcode,
            soc: 1_000_000,
            frac_sec: 0.25,
            time_quality: 0,
            pmus: vec![pmu_data],
            parse_result: ParseResult::NotParsed,
        }
    }

    #[test]
    fn rectangular_integer_phasor_round_trips_both_components() {
        let config = sample_config();
        let frame = sample_frame(&config);
        let mut buf = vec![0u8; 256];
        let n = generate_data_frame(&mut buf, &config, &frame);
        assert!(n > 0);
        buf.truncate(n);

        let parsed = parse_data_frame(&buf, &config);
        assert_eq!(parsed.parse_result, ParseResult::ParseComplete);
        assert_eq!(parsed.pmus.len(), 1);
        let phasor = parsed.pmus[0].phasors[0];
        assert!((phasor.re - 12000.0).abs() < 1.0);
        assert!(
            (phasor.im - (-500.0)).abs() < 1.0,
            "imaginary component must survive the round trip, not be dropped"
        );
    }

    #[test]
    fn id_mismatch_is_advisory_not_fatal() {
        let _ = env_logger::try_init();
        let config = sample_config();
        let mut frame = sample_frame(&config);
        frame.idcode = 999;
        let mut buf = vec![0u8; 256];
        let n = generate_data_frame(&mut buf, &config, &frame);
        buf.truncate(n);

        // generator writes config.idcode regardless of frame.idcode, so
        // force a genuine mismatch by mutating the wire bytes directly.
        buf[4] = 0x00;
        buf[5] = 0x07;
        let crc_start = n - 2;
        let crc = crate::primitives::crc_ccitt(&buf[..crc_start]);
        crate::primitives::write_u16_be(&mut buf, crc_start, crc);

        let parsed = parse_data_frame(&buf, &config);
        assert_eq!(parsed.parse_result, ParseResult::IdMismatch);
        assert_eq!(parsed.pmus.len(), 1, "payload still parsed despite mismatch");
    }

    #[test]
    fn undersized_buffer_is_rejected_before_payload_parse() {
        let _ = env_logger::try_init();
        let config = sample_config();
        let frame = sample_frame(&config);
        let mut buf = vec![0u8; 256];
        let n = generate_data_frame(&mut buf, &config, &frame);
        // truncate without fixing the declared size field: parse_common's
        // own length check should catch it first.
        let truncated = &buf[..n - 4];
        let parsed = parse_data_frame(truncated, &config);
        assert_eq!(parsed.parse_result, ParseResult::LengthMismatch);
        assert!(parsed.pmus.is_empty());
    }

    #[test]
    fn expected_size_matches_generated_length() {
        let config = sample_config();
        let frame = sample_frame(&config);
        let mut buf = vec![0u8; 256];
        let n = generate_data_frame(&mut buf, &config, &frame);
        assert_eq!(n, expected_data_size(&config));
    }
}
