//! Bit-exact IEEE C37.118-2005 synchrophasor frame codec: parse and
//! generate configuration, data, header, and command frames; bridge
//! configurations and data frames to and from JSON; and emit deterministic
//! test/emulation data streams.

mod command_codec;
mod common;
mod config;
mod config_codec;
mod data_codec;
mod error;
mod json_bridge;
mod primitives;
mod stable_source;

pub use command_codec::{
    generate_command, generate_extended_frame, generate_header, get_extended_data, parse_command,
    parse_header, PmuCommand,
};
pub use common::{
    get_id_code, get_packet_size, get_packet_type, parse_time_quality, time_quality_code,
    CommonFrame, FrameType, TimeQuality,
};
pub use config::{
    AnalogType, Config, DataFormat, PhasorCoordinates, PhasorType, PmuConfig, CHANNEL_NAME_SIZE,
};
pub use config_codec::{
    expected_config_size, generate_config1, generate_config2, generate_config3, parse_config1,
    parse_config2, parse_config3,
};
pub use data_codec::{expected_data_size, generate_data_frame, parse_data_frame, PmuData, PmuDataFrame};
pub use error::{JsonBridgeError, ParseResult};
pub use json_bridge::{
    load_config, load_data_file, load_data_frames, write_config, write_data_file,
    write_data_frames,
};
pub use stable_source::{generate_time_codes, Source, StableSource};

pub use num_complex::Complex64;
