//! JSON configuration and data-frame bridge. Mirrors the field-aliasing and
//! per-channel-record expansion rules of the original configuration loader
//! (`configure.cpp`), but walks a `serde_json::Value` tree rather than
//! deriving `Deserialize` directly on the domain types, since the input
//! schema accepts several spellings for the same field and expands compact
//! multi-channel records into individual named channels.

use serde_json::{json, Value};

use crate::config::{AnalogType, Config, DataFormat, PhasorCoordinates, PhasorType, PmuConfig};
use crate::data_codec::{PmuData, PmuDataFrame};
use crate::error::{JsonBridgeError, ParseResult};

fn first_of<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(k))
}

fn str_field(obj: &Value, keys: &[&str], default: &str) -> String {
    first_of(obj, keys)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn f64_field(obj: &Value, keys: &[&str], default: f64) -> f64 {
    first_of(obj, keys).and_then(Value::as_f64).unwrap_or(default)
}

fn u64_field(obj: &Value, keys: &[&str], default: u64) -> u64 {
    first_of(obj, keys).and_then(Value::as_u64).unwrap_or(default)
}

fn i64_field(obj: &Value, keys: &[&str], default: i64) -> i64 {
    first_of(obj, keys).and_then(Value::as_i64).unwrap_or(default)
}

fn data_format_field(obj: &Value, keys: &[&str]) -> DataFormat {
    match str_field(obj, keys, "floating_point").as_str() {
        "integer" => DataFormat::Integer,
        _ => DataFormat::FloatingPoint,
    }
}

fn expand_phasor_names(base: &str, count: u64) -> Vec<String> {
    match count {
        1 => vec![base.to_string()],
        3 => ["A", "B", "C"].iter().map(|s| format!("{base}-{s}")).collect(),
        4 => ["A", "B", "C", "N"].iter().map(|s| format!("{base}-{s}")).collect(),
        n => (1..=n).map(|i| format!("{base}-{i}")).collect(),
    }
}

fn expand_analog_names(base: &str, count: u64) -> Vec<String> {
    if count <= 1 {
        vec![base.to_string()]
    } else {
        (1..=count).map(|i| format!("{base}-{i}")).collect()
    }
}

fn phasor_type_from_str(s: &str) -> Result<PhasorType, JsonBridgeError> {
    match s {
        "voltage" => Ok(PhasorType::Voltage),
        "current" => Ok(PhasorType::Current),
        other => Err(JsonBridgeError::BadPhasorType(other.to_string())),
    }
}

fn analog_type_from_str(s: &str) -> Result<AnalogType, JsonBridgeError> {
    match s {
        "pow" => Ok(AnalogType::SinglePointOnWave),
        "peak" => Ok(AnalogType::Peak),
        "rms" => Ok(AnalogType::Rms),
        other => Err(JsonBridgeError::BadAnalogType(other.to_string())),
    }
}

fn for_each_record<'a>(value: &'a Value, mut f: impl FnMut(&'a Value)) {
    match value {
        Value::Array(items) => items.iter().for_each(&mut f),
        Value::Object(_) => f(value),
        _ => {}
    }
}

fn insert_phasor_config(record: &Value, pmu: &mut PmuConfig) -> Result<(), JsonBridgeError> {
    let name = str_field(record, &["name"], "PHASOR");
    let count = u64_field(record, &["count"], 1);
    let type_str = str_field(record, &["type"], "voltage");
    let phasor_type = phasor_type_from_str(&type_str)?;
    let scale = i64_field(record, &["scale"], 0) as u32;

    for expanded in expand_phasor_names(&name, count) {
        pmu.phasor_names.push(expanded);
        pmu.phasor_type.push(phasor_type);
        pmu.phasor_conversion.push(scale);
    }
    Ok(())
}

fn insert_analog_config(record: &Value, pmu: &mut PmuConfig) -> Result<(), JsonBridgeError> {
    let name = str_field(record, &["name"], "ANALOG");
    let count = u64_field(record, &["count"], 1);
    let type_str = str_field(record, &["type"], "pow");
    let analog_type = analog_type_from_str(&type_str)?;
    let scale = i64_field(record, &["scale"], 0) as i32;

    for expanded in expand_analog_names(&name, count) {
        pmu.analog_names.push(expanded);
        pmu.analog_type.push(analog_type);
        pmu.analog_conversion.push(scale);
    }
    Ok(())
}

fn insert_digital_config(record: &Value, pmu: &mut PmuConfig) -> Result<(), JsonBridgeError> {
    // `name` is polymorphic, same as phasor/analog records: a 16-element
    // array supplies explicit channel names, a scalar string means
    // "synthesize name0..name15".
    let names: Vec<String> = match record.get("name") {
        Some(Value::Array(arr)) if arr.len() == 16 => {
            arr.iter().map(|v| v.as_str().unwrap_or("").to_string()).collect()
        }
        Some(Value::Array(arr)) => return Err(JsonBridgeError::BadDigitalNameCount(arr.len())),
        Some(Value::String(base)) => (0..16).map(|i| format!("{base}{i}")).collect(),
        _ => (0..16).map(|i| format!("DIGITAL{i}")).collect(),
    };
    let active = mask_field(record, &["active"]);
    let nominal = mask_field(record, &["nominal"]);

    pmu.digital_channel_names.extend(names);
    pmu.digital_active.push(active);
    pmu.digital_nominal.push(nominal);
    Ok(())
}

fn mask_field(record: &Value, keys: &[&str]) -> u16 {
    match first_of(record, keys) {
        Some(Value::Bool(true)) => 0xFFFF,
        Some(Value::Bool(false)) => 0x0000,
        Some(v) => v.as_u64().unwrap_or(0) as u16,
        None => 0,
    }
}

fn load_pmu_config(record: &Value) -> Result<PmuConfig, JsonBridgeError> {
    let mut pmu = PmuConfig::default();
    pmu.set_station_name(&str_field(record, &["name", "station_name"], "STATION"));
    pmu.source_id = u64_field(record, &["id", "idcode", "source_id"], 0) as u16;
    pmu.change_count = u64_field(record, &["cfgcnt", "change_count"], 0) as u16;
    pmu.lat = f64_field(record, &["lat"], f64::from(f32::INFINITY)) as f32;
    pmu.lon = f64_field(record, &["lon"], f64::from(f32::INFINITY)) as f32;
    pmu.elev = f64_field(record, &["elev"], f64::from(f32::INFINITY)) as f32;

    pmu.phasor_format = data_format_field(record, &["phasor_format"]);
    pmu.analog_format = data_format_field(record, &["analog_format"]);
    pmu.freq_format = data_format_field(record, &["frequency_format"]);
    pmu.phasor_coordinates = match str_field(record, &["phasor_coordinates"], "rectangular").as_str() {
        "polar" => PhasorCoordinates::Polar,
        _ => PhasorCoordinates::Rectangular,
    };
    pmu.nominal_frequency =
        f64_field(record, &["nominal_frequency", "nominalfrequency", "fnom"], 60.0) as f32;

    if let Some(phasors) = record.get("phasor") {
        let mut err = None;
        for_each_record(phasors, |r| {
            if err.is_none() {
                if let Err(e) = insert_phasor_config(r, &mut pmu) {
                    err = Some(e);
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    }
    if let Some(analogs) = record.get("analog") {
        let mut err = None;
        for_each_record(analogs, |r| {
            if err.is_none() {
                if let Err(e) = insert_analog_config(r, &mut pmu) {
                    err = Some(e);
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    }
    if let Some(digitals) = record.get("digital") {
        let mut err = None;
        for_each_record(digitals, |r| {
            if err.is_none() {
                if let Err(e) = insert_digital_config(r, &mut pmu) {
                    err = Some(e);
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    }

    Ok(pmu)
}

fn load_config_value(root: &Value) -> Result<Config, JsonBridgeError> {
    let base = root.get("config").unwrap_or(root);

    let mut config = Config {
        idcode: u64_field(base, &["id", "idcode"], 0) as u16,
        data_rate: i64_field(base, &["datarate", "data_rate"], 30) as i16,
        time_base: u64_field(base, &["time_base", "timebase"], 1_000_000) as u32,
        ..Config::default()
    };

    if let Some(pmus) = base.get("pmu") {
        match pmus {
            Value::Array(items) => {
                for item in items {
                    config.pmus.push(load_pmu_config(item)?);
                }
            }
            Value::Object(_) => {
                let mut pmu = load_pmu_config(pmus)?;
                if pmu.source_id == 0 {
                    pmu.source_id = config.idcode;
                }
                config.pmus.push(pmu);
            }
            _ => {}
        }
    }

    Ok(config)
}

/// Parse a JSON configuration document into a [`Config`]. Accepts either a
/// bare `{"pmu": ...}` object or one wrapped as `{"config": {...}}`.
pub fn load_config(text: &str) -> Result<Config, JsonBridgeError> {
    if text.trim().len() < 5 {
        return Err(JsonBridgeError::TooShort);
    }
    let root: Value = serde_json::from_str(text)?;
    load_config_value(&root)
}

fn pmu_config_to_json(pmu: &PmuConfig) -> Value {
    let mut obj = json!({
        "name": pmu.station_name(),
        "idcode": pmu.source_id,
        "cfgcnt": pmu.change_count,
        "phasor_format": if pmu.phasor_format == DataFormat::Integer { "integer" } else { "floating_point" },
        "analog_format": if pmu.analog_format == DataFormat::Integer { "integer" } else { "floating_point" },
        "frequency_format": if pmu.freq_format == DataFormat::Integer { "integer" } else { "floating_point" },
        "phasor_coordinates": if pmu.phasor_coordinates == PhasorCoordinates::Polar { "polar" } else { "rectangular" },
        "nominal_frequency": pmu.nominal_frequency,
    });

    if !pmu.phasor_names.is_empty() {
        let phasors: Vec<Value> = pmu
            .phasor_names
            .iter()
            .zip(pmu.phasor_type.iter())
            .zip(pmu.phasor_conversion.iter())
            .map(|((name, ty), conv)| {
                json!({
                    "name": name,
                    "type": if ty.is_current() { "current" } else { "voltage" },
                    "scale": conv,
                })
            })
            .collect();
        obj["phasor"] = Value::Array(phasors);
    }
    if !pmu.analog_names.is_empty() {
        let analogs: Vec<Value> = pmu
            .analog_names
            .iter()
            .zip(pmu.analog_type.iter())
            .zip(pmu.analog_conversion.iter())
            .map(|((name, ty), conv)| {
                let type_str = match ty {
                    AnalogType::SinglePointOnWave | AnalogType::SinglePointOnWaveDisabled => "pow",
                    AnalogType::Peak | AnalogType::PeakDisabled => "peak",
                    AnalogType::Rms | AnalogType::RmsDisabled => "rms",
                };
                json!({ "name": name, "type": type_str, "scale": conv })
            })
            .collect();
        obj["analog"] = Value::Array(analogs);
    }

    obj
}

/// Serialize a [`Config`] back into the `{"config": {...}}` JSON document
/// shape, inverse of [`load_config`].
pub fn write_config(config: &Config) -> String {
    let pmus: Vec<Value> = config.pmus.iter().map(pmu_config_to_json).collect();
    let doc = json!({
        "config": {
            "idcode": config.idcode,
            "data_rate": config.data_rate,
            "time_base": config.time_base,
            "pmu": pmus,
        }
    });
    serde_json::to_string_pretty(&doc).expect("Value serialization is infallible")
}

fn data_frame_to_json(frame: &PmuDataFrame) -> Value {
    let pmus: Vec<Value> = frame
        .pmus
        .iter()
        .map(|p| {
            json!({
                "stat": p.stat,
                "phasors": p.phasors.iter().map(|c| json!([c.re, c.im])).collect::<Vec<_>>(),
                "freq": p.freq,
                "rocof": p.rocof,
                "analog": p.analog,
                "digital": p.digital,
            })
        })
        .collect();
    json!({
        "idcode": frame.idcode,
        "soc": frame.soc,
        "frac_sec": frame.frac_sec,
        "time_quality": frame.time_quality,
        "pmu": pmus,
    })
}

fn data_frame_from_json(value: &Value) -> PmuDataFrame {
    let mut frame = PmuDataFrame {
        idcode: u64_field(value, &["idcode", "id"], 0) as u16,
        soc: u64_field(value, &["soc"], 0) as u32,
        frac_sec: f64_field(value, &["frac_sec", "fracsec"], 0.0),
        time_quality: u64_field(value, &["time_quality"], 0) as u8,
        pmus: Vec::new(),
        parse_result: ParseResult::NotParsed,
    };
    if let Some(Value::Array(pmus)) = value.get("pmu") {
        for p in pmus {
            let phasors = p
                .get("phasors")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_array())
                        .filter(|pair| pair.len() == 2)
                        .map(|pair| {
                            num_complex::Complex64::new(
                                pair[0].as_f64().unwrap_or(0.0),
                                pair[1].as_f64().unwrap_or(0.0),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            let analog = p
                .get("analog")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            let digital = p
                .get("digital")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_u64()).map(|v| v as u16).collect())
                .unwrap_or_default();
            frame.pmus.push(PmuData {
                stat: u64_field(p, &["stat"], 0) as u16,
                phasors,
                freq: f64_field(p, &["freq"], 0.0),
                rocof: f64_field(p, &["rocof"], 0.0),
                analog,
                digital,
            });
        }
    }
    frame
}

/// Load a single data frame (or the first element of an array document).
pub fn load_data_file(text: &str) -> Result<PmuDataFrame, JsonBridgeError> {
    let root: Value = serde_json::from_str(text)?;
    let value = match &root {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    Ok(data_frame_from_json(value))
}

/// Load every data frame in an array document.
pub fn load_data_frames(text: &str) -> Result<Vec<PmuDataFrame>, JsonBridgeError> {
    let root: Value = serde_json::from_str(text)?;
    match root {
        Value::Array(items) => Ok(items.iter().map(data_frame_from_json).collect()),
        other => Ok(vec![data_frame_from_json(&other)]),
    }
}

pub fn write_data_file(frame: &PmuDataFrame) -> String {
    serde_json::to_string_pretty(&data_frame_to_json(frame)).expect("Value serialization is infallible")
}

pub fn write_data_frames(frames: &[PmuDataFrame]) -> String {
    let arr: Vec<Value> = frames.iter().map(data_frame_to_json).collect();
    serde_json::to_string_pretty(&Value::Array(arr)).expect("Value serialization is infallible")
}
