//! Parse result taxonomy and the `thiserror` wrappers used at the few API
//! surfaces (JSON bridge, stable source config load) that need a real
//! `std::error::Error` rather than the parse-path sum type.

/// Outcome of a parse operation. Every `parse_*` entry point in this crate
/// returns one of these directly (or embeds it in a record's `parse_result`
/// field) rather than an exception or a bare bool.
///
/// Negative values are failures, `ParseComplete` is success, and
/// `NotParsed` is the default/initial state of a record that hasn't been
/// touched yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ParseResult {
    /// byte[0] != 0xAA
    InvalidSync = -16,
    /// CRC mismatch
    InvalidChecksum = -12,
    /// data frame sourceID != config.idcode; parsing continues
    IdMismatch = -9,
    /// frame type inconsistent with the call
    IncorrectType = -6,
    /// e.g. parseConfig3
    NotImplemented = -4,
    /// declared size > supplied buffer; caller should read more and retry
    LengthMismatch = -3,
    /// data payload smaller than expected_size(config)
    ConfigMismatch = -1,
    /// success
    ParseComplete = 0,
    /// initial state of a default-constructed result
    NotParsed = 2,
}

impl ParseResult {
    pub fn is_success(self) -> bool {
        matches!(self, ParseResult::ParseComplete)
    }

    /// True for results where the caller should keep the data it got
    /// (advisory) rather than discard the whole record.
    pub fn is_advisory(self) -> bool {
        matches!(self, ParseResult::IdMismatch)
    }
}

impl Default for ParseResult {
    fn default() -> Self {
        ParseResult::NotParsed
    }
}

/// Errors surfaced by the JSON configuration/data-frame bridge.
#[derive(Debug, thiserror::Error)]
pub enum JsonBridgeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration document too short to be valid")]
    TooShort,
    #[error("unrecognized phasor type {0:?}, expected \"voltage\" or \"current\"")]
    BadPhasorType(String),
    #[error("unrecognized analog type {0:?}, expected \"pow\", \"peak\", or \"rms\"")]
    BadAnalogType(String),
    #[error("digital channel name array must have exactly 16 entries, got {0}")]
    BadDigitalNameCount(usize),
}
