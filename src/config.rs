//! The configuration model: a typed, in-memory representation of a
//! multi-PMU configuration and its per-PMU channel layout. Pure data, with
//! default construction and the small bits of type-safe access the wire
//! codec needs (station-name padding/truncation, format-flag packing).

pub const CHANNEL_NAME_SIZE: usize = 16;

/// Numeric representation used for a channel's value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Integer,
    FloatingPoint,
}

/// Phasor representation used for a channel's value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhasorCoordinates {
    #[default]
    Rectangular,
    Polar,
}

/// Phasor channel type, with the high bit marking a disabled channel
/// (still present in the frame layout, but flagged as not meaningful).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasorType {
    Voltage,
    Current,
    VoltageDisabled,
    CurrentDisabled,
}

impl PhasorType {
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            0 => PhasorType::Voltage,
            0b1000_0000 => PhasorType::VoltageDisabled,
            0b1000_0001 => PhasorType::CurrentDisabled,
            _ => PhasorType::Current,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            PhasorType::Voltage => 0,
            PhasorType::Current => 1,
            PhasorType::VoltageDisabled => 0b1000_0000,
            PhasorType::CurrentDisabled => 0b1000_0001,
        }
    }

    pub fn is_current(self) -> bool {
        matches!(self, PhasorType::Current | PhasorType::CurrentDisabled)
    }
}

/// Analog channel type, with the high bit marking a disabled channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogType {
    SinglePointOnWave,
    Rms,
    Peak,
    SinglePointOnWaveDisabled,
    RmsDisabled,
    PeakDisabled,
}

impl AnalogType {
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            0 => AnalogType::SinglePointOnWave,
            1 => AnalogType::Rms,
            2 => AnalogType::Peak,
            0b1000_0000 => AnalogType::SinglePointOnWaveDisabled,
            0b1000_0001 => AnalogType::RmsDisabled,
            _ => AnalogType::PeakDisabled,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            AnalogType::SinglePointOnWave => 0,
            AnalogType::Rms => 1,
            AnalogType::Peak => 2,
            AnalogType::SinglePointOnWaveDisabled => 0b1000_0000,
            AnalogType::RmsDisabled => 0b1000_0001,
            AnalogType::PeakDisabled => 0b1000_0010,
        }
    }
}

/// Per-PMU layout and channel metadata, as carried by a CFG-1/CFG-2 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PmuConfig {
    pub source_id: u16,
    station_name: [u8; CHANNEL_NAME_SIZE],

    pub freq_format: DataFormat,
    pub analog_format: DataFormat,
    pub phasor_format: DataFormat,
    pub phasor_coordinates: PhasorCoordinates,

    pub phasor_names: Vec<String>,
    pub analog_names: Vec<String>,
    pub digital_channel_names: Vec<String>,

    pub phasor_type: Vec<PhasorType>,
    pub phasor_conversion: Vec<u32>,
    pub analog_type: Vec<AnalogType>,
    pub analog_conversion: Vec<i32>,
    pub digital_nominal: Vec<u16>,
    pub digital_active: Vec<u16>,

    pub nominal_frequency: f32,
    pub change_count: u16,
    pub active: bool,

    /// Station coordinates; not present on the 2005 wire layout but carried
    /// as API/JSON-level metadata (see SPEC_FULL.md §3).
    pub lat: f32,
    pub lon: f32,
    pub elev: f32,
    pub window: u32,
    pub grp_delay: u32,
}

impl Default for PmuConfig {
    fn default() -> Self {
        PmuConfig {
            source_id: 0,
            station_name: [0u8; CHANNEL_NAME_SIZE],
            freq_format: DataFormat::FloatingPoint,
            analog_format: DataFormat::FloatingPoint,
            phasor_format: DataFormat::FloatingPoint,
            phasor_coordinates: PhasorCoordinates::Rectangular,
            phasor_names: Vec::new(),
            analog_names: Vec::new(),
            digital_channel_names: Vec::new(),
            phasor_type: Vec::new(),
            phasor_conversion: Vec::new(),
            analog_type: Vec::new(),
            analog_conversion: Vec::new(),
            digital_nominal: Vec::new(),
            digital_active: Vec::new(),
            nominal_frequency: 60.0,
            change_count: 0,
            active: true,
            lat: f32::INFINITY,
            lon: f32::INFINITY,
            elev: f32::INFINITY,
            window: 0,
            grp_delay: 0,
        }
    }
}

impl PmuConfig {
    pub fn phasor_count(&self) -> u16 {
        self.phasor_names.len() as u16
    }

    pub fn analog_count(&self) -> u16 {
        self.analog_names.len() as u16
    }

    pub fn digital_word_count(&self) -> u16 {
        (self.digital_channel_names.len() / CHANNEL_NAME_SIZE) as u16
    }

    /// Station name with trailing NUL padding stripped.
    pub fn station_name(&self) -> String {
        let end = self
            .station_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CHANNEL_NAME_SIZE);
        String::from_utf8_lossy(&self.station_name[..end]).into_owned()
    }

    /// Set the station name, truncating to 16 bytes or right-padding with
    /// NUL, exactly as the wire layout requires (never NUL-terminated).
    pub fn set_station_name(&mut self, name: &str) {
        self.station_name = pad_name(name.as_bytes());
    }

    pub(crate) fn station_name_bytes(&self) -> &[u8; CHANNEL_NAME_SIZE] {
        &self.station_name
    }

    pub(crate) fn set_station_name_bytes(&mut self, bytes: [u8; CHANNEL_NAME_SIZE]) {
        self.station_name = bytes;
    }
}

/// Truncate or right-pad `bytes` to exactly [`CHANNEL_NAME_SIZE`] bytes.
pub(crate) fn pad_name(bytes: &[u8]) -> [u8; CHANNEL_NAME_SIZE] {
    let mut out = [0u8; CHANNEL_NAME_SIZE];
    let n = bytes.len().min(CHANNEL_NAME_SIZE);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// The global station configuration: an ordered roster of PMUs plus the
/// time base, data rate, and the transient `soc`/`fracsec` fields a CFG
/// frame parse/emit carries alongside the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub idcode: u16,
    pub data_rate: i16,
    pub soc: u32,
    pub fracsec: u32,
    pub time_base: u32,
    pub pmus: Vec<PmuConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            idcode: 0,
            data_rate: 30,
            soc: 0,
            fracsec: 0,
            time_base: 1_000_000,
            pmus: Vec::new(),
        }
    }
}
