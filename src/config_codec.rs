//! CFG-1 / CFG-2 frame parsing and generation. Layout is identical between
//! the two frame types in the 2005 revision; CFG-2 additionally honors
//! `PmuConfig::active` when emitting (omitting inactive PMUs), matching
//! spec.md §4.D.

use crate::common::{parse_common, write_common_header, write_crc, write_size, write_time, FrameType};
use crate::config::{
    pad_name, AnalogType, Config, DataFormat, PhasorCoordinates, PhasorType, PmuConfig,
    CHANNEL_NAME_SIZE,
};
use crate::error::ParseResult;
use crate::primitives::{
    read_i16_be, read_u16_be, read_u24_be, sign_extend_24, write_i16_be, write_i24_be,
    write_u16_be, write_u24_be,
};

fn parse_pmu_config(data: &[u8]) -> (PmuConfig, usize) {
    let mut pmu = PmuConfig::default();
    let mut used = 0usize;

    let mut name = [0u8; CHANNEL_NAME_SIZE];
    name.copy_from_slice(&data[..CHANNEL_NAME_SIZE]);
    pmu.set_station_name_bytes(name);
    used += CHANNEL_NAME_SIZE;

    pmu.source_id = read_u16_be(data, used);
    used += 2;

    let format = read_u16_be(data, used);
    pmu.freq_format = if format & 0b1000 == 0 {
        DataFormat::Integer
    } else {
        DataFormat::FloatingPoint
    };
    pmu.analog_format = if format & 0b0100 == 0 {
        DataFormat::Integer
    } else {
        DataFormat::FloatingPoint
    };
    pmu.phasor_format = if format & 0b0010 == 0 {
        DataFormat::Integer
    } else {
        DataFormat::FloatingPoint
    };
    pmu.phasor_coordinates = if format & 0b0001 == 0 {
        PhasorCoordinates::Rectangular
    } else {
        PhasorCoordinates::Polar
    };
    used += 2;

    let phasor_count = read_u16_be(data, used) as usize;
    used += 2;
    let analog_count = read_u16_be(data, used) as usize;
    used += 2;
    let digital_word_count = read_u16_be(data, used) as usize;
    used += 2;

    for _ in 0..phasor_count {
        pmu.phasor_names
            .push(decode_channel_name(&data[used..used + CHANNEL_NAME_SIZE]));
        used += CHANNEL_NAME_SIZE;
    }
    for _ in 0..analog_count {
        pmu.analog_names
            .push(decode_channel_name(&data[used..used + CHANNEL_NAME_SIZE]));
        used += CHANNEL_NAME_SIZE;
    }
    for _ in 0..digital_word_count * 16 {
        pmu.digital_channel_names
            .push(decode_channel_name(&data[used..used + CHANNEL_NAME_SIZE]));
        used += CHANNEL_NAME_SIZE;
    }

    for _ in 0..phasor_count {
        pmu.phasor_type.push(PhasorType::from_wire(data[used]));
        pmu.phasor_conversion.push(
            (data[used + 1] as u32) << 16 | (data[used + 2] as u32) << 8 | data[used + 3] as u32,
        );
        used += 4;
    }
    for _ in 0..analog_count {
        pmu.analog_type.push(AnalogType::from_wire(data[used]));
        let raw = read_u24_be(data, used + 1);
        pmu.analog_conversion.push(sign_extend_24(raw));
        used += 4;
    }
    for _ in 0..digital_word_count {
        pmu.digital_nominal.push(read_u16_be(data, used));
        pmu.digital_active.push(read_u16_be(data, used + 2));
        used += 4;
    }

    // reserved byte, then the 50/60Hz flag byte.
    pmu.nominal_frequency = if data[used + 1] == 1 { 50.0 } else { 60.0 };
    used += 2;
    pmu.change_count = read_u16_be(data, used);
    used += 2;

    (pmu, used)
}

fn decode_channel_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn parse_config_frame(data: &[u8]) -> Result<Config, ParseResult> {
    let frame = parse_common(data)?;
    if !matches!(frame.frame_type, FrameType::Config1 | FrameType::Config2) {
        return Err(ParseResult::IncorrectType);
    }
    let mut config = Config {
        idcode: frame.source_id,
        soc: frame.soc,
        fracsec: frame.frac_sec,
        ..Config::default()
    };
    config.time_base = read_u24_be(data, 15);
    let num_pmu = read_u16_be(data, 18) as usize;

    let mut used = 20usize;
    for _ in 0..num_pmu {
        let (pmu, consumed) = parse_pmu_config(&data[used..]);
        config.pmus.push(pmu);
        used += consumed;
    }
    config.data_rate = read_i16_be(data, used);
    Ok(config)
}

pub fn parse_config1(data: &[u8]) -> Result<Config, ParseResult> {
    parse_config_frame(data)
}

pub fn parse_config2(data: &[u8]) -> Result<Config, ParseResult> {
    parse_config_frame(data)
}

pub fn parse_config3(_data: &[u8]) -> Result<Config, ParseResult> {
    log::debug!("parse_config3: CFG-3 is not implemented");
    Err(ParseResult::NotImplemented)
}

fn pmu_config_size(pmu: &PmuConfig) -> usize {
    let phasor_count = pmu.phasor_count() as usize;
    let analog_count = pmu.analog_count() as usize;
    let digital_word_count = pmu.digital_word_count() as usize;
    30 + (CHANNEL_NAME_SIZE + 4) * phasor_count
        + (CHANNEL_NAME_SIZE + 4) * analog_count
        + (16 * CHANNEL_NAME_SIZE + 4) * digital_word_count
}

fn roster<'a>(config: &'a Config, active_only: bool) -> Vec<&'a PmuConfig> {
    config
        .pmus
        .iter()
        .filter(|p| p.active || !active_only)
        .collect()
}

/// Total frame size (including the 14-byte common header and 2-byte CRC
/// trailer) a CFG-1/CFG-2 emission of `config` will produce.
pub fn expected_config_size(config: &Config, active_only: bool) -> usize {
    24 + roster(config, active_only)
        .iter()
        .map(|pmu| pmu_config_size(pmu))
        .sum::<usize>()
}

fn write_pmu_config(dst: &mut [u8], pmu: &PmuConfig) -> usize {
    let mut used = 0usize;
    dst[..CHANNEL_NAME_SIZE].copy_from_slice(pmu.station_name_bytes());
    used += CHANNEL_NAME_SIZE;

    write_u16_be(dst, used, pmu.source_id);
    used += 2;

    let mut format = 0u16;
    if pmu.freq_format == DataFormat::FloatingPoint {
        format |= 0b1000;
    }
    if pmu.analog_format == DataFormat::FloatingPoint {
        format |= 0b0100;
    }
    if pmu.phasor_format == DataFormat::FloatingPoint {
        format |= 0b0010;
    }
    if pmu.phasor_coordinates == PhasorCoordinates::Polar {
        format |= 0b0001;
    }
    write_u16_be(dst, used, format);
    used += 2;

    write_u16_be(dst, used, pmu.phasor_count());
    used += 2;
    write_u16_be(dst, used, pmu.analog_count());
    used += 2;
    write_u16_be(dst, used, pmu.digital_word_count());
    used += 2;

    for name in &pmu.phasor_names {
        dst[used..used + CHANNEL_NAME_SIZE].copy_from_slice(&pad_name(name.as_bytes()));
        used += CHANNEL_NAME_SIZE;
    }
    for name in &pmu.analog_names {
        dst[used..used + CHANNEL_NAME_SIZE].copy_from_slice(&pad_name(name.as_bytes()));
        used += CHANNEL_NAME_SIZE;
    }
    for name in &pmu.digital_channel_names {
        dst[used..used + CHANNEL_NAME_SIZE].copy_from_slice(&pad_name(name.as_bytes()));
        used += CHANNEL_NAME_SIZE;
    }

    for (ty, conv) in pmu.phasor_type.iter().zip(pmu.phasor_conversion.iter()) {
        dst[used] = ty.to_wire();
        write_u24_be(dst, used + 1, conv & 0x00FF_FFFF);
        used += 4;
    }
    for (ty, conv) in pmu.analog_type.iter().zip(pmu.analog_conversion.iter()) {
        dst[used] = ty.to_wire();
        write_i24_be(dst, used + 1, *conv);
        used += 4;
    }
    for (nominal, active) in pmu.digital_nominal.iter().zip(pmu.digital_active.iter()) {
        write_u16_be(dst, used, *nominal);
        write_u16_be(dst, used + 2, *active);
        used += 4;
    }

    dst[used] = 0;
    dst[used + 1] = if pmu.nominal_frequency == 50.0 { 1 } else { 0 };
    used += 2;
    write_u16_be(dst, used, pmu.change_count);
    used += 2;

    used
}

fn generate_config_frame(
    dst: &mut [u8],
    config: &Config,
    frame_type: FrameType,
    active_only: bool,
) -> usize {
    let needed = expected_config_size(config, active_only);
    if dst.len() < needed {
        return 0;
    }
    write_common_header(dst, config.idcode, frame_type).unwrap();
    write_time(dst, config.soc, config.fracsec);
    write_u24_be(dst, 15, config.time_base);

    let pmus = roster(config, active_only);
    write_u16_be(dst, 18, pmus.len() as u16);

    let mut used = 20usize;
    for pmu in pmus {
        used += write_pmu_config(&mut dst[used..], pmu);
    }
    write_i16_be(dst, used, config.data_rate);
    used += 2;
    used += 2; // trailing CRC
    write_size(dst, used as u16);
    write_crc(dst, used as u16);
    used
}

pub fn generate_config1(dst: &mut [u8], config: &Config) -> usize {
    generate_config_frame(dst, config, FrameType::Config1, false)
}

pub fn generate_config2(dst: &mut [u8], config: &Config) -> usize {
    generate_config_frame(dst, config, FrameType::Config2, true)
}

pub fn generate_config3(_dst: &mut [u8], _config: &Config) -> usize {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhasorType as PT;

    fn one_pmu_config() -> Config {
        let mut pmu = PmuConfig::default();
        pmu.set_station_name("Station A");
        pmu.source_id = 7734;
        pmu.phasor_names = vec!["VA".into(), "VB".into(), "VC".into(), "IA".into()];
        pmu.phasor_type = vec![PT::Voltage, PT::Voltage, PT::Voltage, PT::Current];
        pmu.phasor_conversion = vec![1000, 1000, 1000, 10];
        pmu.analog_names = vec!["Pwr".into()];
        pmu.analog_type = vec![AnalogType::Rms];
        pmu.analog_conversion = vec![1];
        pmu.digital_channel_names = (0..16).map(|i| format!("d{i}")).collect();
        pmu.digital_nominal = vec![0xFFFF];
        pmu.digital_active = vec![0x0001];
        pmu.phasor_format = DataFormat::Integer;
        pmu.freq_format = DataFormat::Integer;
        pmu.analog_format = DataFormat::Integer;
        pmu.change_count = 3;

        Config {
            idcode: 7734,
            data_rate: 30,
            soc: 1_000_000,
            fracsec: 0,
            time_base: 1_000_000,
            pmus: vec![pmu],
        }
    }

    #[test]
    fn config2_round_trips_when_all_active() {
        let config = one_pmu_config();
        let mut buf = vec![0u8; 1024];
        let n = generate_config2(&mut buf, &config);
        assert!(n > 0);
        buf.truncate(n);

        let parsed = parse_config2(&buf).expect("parse");
        assert_eq!(parsed.idcode, 7734);
        assert_eq!(parsed.time_base, 1_000_000);
        assert_eq!(parsed.pmus.len(), 1);
        assert_eq!(parsed.pmus[0].phasor_count(), 4);
        assert_eq!(parsed.pmus[0].digital_word_count(), 1);
        assert_eq!(parsed.pmus[0].station_name(), "Station A");

        let mut buf2 = vec![0u8; 1024];
        let n2 = generate_config2(&mut buf2, &parsed);
        buf2.truncate(n2);
        assert_eq!(buf, buf2, "re-emission must reproduce the original bytes");
    }

    #[test]
    fn config2_omits_inactive_pmus_but_size_matches_emission() {
        let mut config = one_pmu_config();
        let mut inactive = config.pmus[0].clone();
        inactive.active = false;
        inactive.source_id = 9999;
        config.pmus.push(inactive);

        let mut buf = vec![0u8; 2048];
        let n = generate_config2(&mut buf, &config);
        buf.truncate(n);

        let declared_size = read_u16_be(&buf, 2);
        assert_eq!(declared_size as usize, n, "size prefix must match actual emission");

        let parsed = parse_config2(&buf).unwrap();
        assert_eq!(parsed.pmus.len(), 1, "only the active PMU was emitted");
    }

    #[test]
    fn config1_always_emits_every_pmu() {
        let mut config = one_pmu_config();
        let mut inactive = config.pmus[0].clone();
        inactive.active = false;
        config.pmus.push(inactive);

        let mut buf = vec![0u8; 2048];
        let n = generate_config1(&mut buf, &config);
        buf.truncate(n);
        let parsed = parse_config1(&buf).unwrap();
        assert_eq!(parsed.pmus.len(), 2);
    }

    #[test]
    fn too_small_buffer_returns_zero() {
        let config = one_pmu_config();
        let mut buf = vec![0u8; 10];
        assert_eq!(generate_config2(&mut buf, &config), 0);
    }

    #[test]
    fn config3_is_not_implemented() {
        assert_eq!(parse_config3(&[0u8; 32]), Err(ParseResult::NotImplemented));
        assert_eq!(generate_config3(&mut [0u8; 32], &Config::default()), 0);
    }
}
