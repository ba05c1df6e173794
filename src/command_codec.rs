//! Header and command frames: the small control-plane messages exchanged
//! outside the config/data stream (turn a PMU's transmission on/off, request
//! a configuration resend, carry an arbitrary human-readable header string).

use crate::common::{
    parse_common, write_common_header, write_crc, write_size, FrameType, COMMON_FRAME_SIZE,
};
use crate::error::ParseResult;
use crate::primitives::{read_u16_be, write_u16_be};

/// Command codes a PDC can send a PMU, per the low byte of the 2-byte
/// command field at offset 14.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmuCommand {
    DataOff,
    DataOn,
    SendHeader,
    SendConfig1,
    SendConfig2,
    SendConfig3,
    Extended,
    Unknown(u16),
}

impl PmuCommand {
    pub fn from_wire(code: u16) -> Self {
        match code {
            1 => PmuCommand::DataOff,
            2 => PmuCommand::DataOn,
            3 => PmuCommand::SendHeader,
            4 => PmuCommand::SendConfig1,
            5 => PmuCommand::SendConfig2,
            6 => PmuCommand::SendConfig3,
            8 => PmuCommand::Extended,
            other => PmuCommand::Unknown(other),
        }
    }

    pub fn to_wire(self) -> u16 {
        match self {
            PmuCommand::DataOff => 1,
            PmuCommand::DataOn => 2,
            PmuCommand::SendHeader => 3,
            PmuCommand::SendConfig1 => 4,
            PmuCommand::SendConfig2 => 5,
            PmuCommand::SendConfig3 => 6,
            PmuCommand::Extended => 8,
            PmuCommand::Unknown(code) => code,
        }
    }
}

const COMMAND_FRAME_SIZE: usize = 18;

/// Fixed 18-byte command frame: common header, 2-byte command code, CRC.
pub fn generate_command(dst: &mut [u8], idcode: u16, command: PmuCommand) -> usize {
    if dst.len() < COMMAND_FRAME_SIZE {
        return 0;
    }
    write_common_header(dst, idcode, FrameType::Command).unwrap();
    write_u16_be(dst, COMMON_FRAME_SIZE, command.to_wire());
    write_size(dst, COMMAND_FRAME_SIZE as u16);
    write_crc(dst, COMMAND_FRAME_SIZE as u16);
    COMMAND_FRAME_SIZE
}

pub fn parse_command(data: &[u8]) -> Result<(u16, PmuCommand), ParseResult> {
    let frame = parse_common(data)?;
    if frame.frame_type != FrameType::Command {
        return Err(ParseResult::IncorrectType);
    }
    let code = read_u16_be(data, COMMON_FRAME_SIZE);
    Ok((frame.source_id, PmuCommand::from_wire(code)))
}

/// Emit a header frame carrying an arbitrary descriptive string.
pub fn generate_header(dst: &mut [u8], idcode: u16, text: &str) -> usize {
    let needed = (COMMON_FRAME_SIZE + text.len() + 2).max(crate::common::MIN_PACKET_SIZE);
    if dst.len() < needed {
        return 0;
    }
    write_common_header(dst, idcode, FrameType::Header).unwrap();
    dst[COMMON_FRAME_SIZE..COMMON_FRAME_SIZE + text.len()].copy_from_slice(text.as_bytes());
    let used = COMMON_FRAME_SIZE + text.len() + 2;
    write_size(dst, used as u16);
    write_crc(dst, used as u16);
    used
}

pub fn parse_header(data: &[u8]) -> Result<String, ParseResult> {
    let frame = parse_common(data)?;
    if frame.frame_type != FrameType::Header {
        return Err(ParseResult::IncorrectType);
    }
    let text_end = frame.byte_count as usize - 2;
    Ok(String::from_utf8_lossy(&data[COMMON_FRAME_SIZE..text_end]).into_owned())
}

/// Emit an extended-frame command: a command frame (code = [`PmuCommand::Extended`])
/// carrying an arbitrary payload after the command code, used for
/// vendor-specific control messages.
pub fn generate_extended_frame(dst: &mut [u8], idcode: u16, payload: &[u8]) -> usize {
    let needed = COMMON_FRAME_SIZE + 2 + payload.len() + 2;
    if dst.len() < needed {
        return 0;
    }
    write_common_header(dst, idcode, FrameType::Command).unwrap();
    write_u16_be(dst, COMMON_FRAME_SIZE, PmuCommand::Extended.to_wire());
    let payload_start = COMMON_FRAME_SIZE + 2;
    dst[payload_start..payload_start + payload.len()].copy_from_slice(payload);
    let used = payload_start + payload.len() + 2;
    write_size(dst, used as u16);
    write_crc(dst, used as u16);
    used
}

/// Extract the payload of an extended-frame command, failing with
/// [`ParseResult::IncorrectType`] if the frame isn't a command frame, or
/// [`ParseResult::NotImplemented`] if it's a command frame but not an
/// extended one.
pub fn get_extended_data(data: &[u8]) -> Result<Vec<u8>, ParseResult> {
    let frame = parse_common(data)?;
    if frame.frame_type != FrameType::Command {
        return Err(ParseResult::IncorrectType);
    }
    let code = read_u16_be(data, COMMON_FRAME_SIZE);
    if PmuCommand::from_wire(code) != PmuCommand::Extended {
        return Err(ParseResult::NotImplemented);
    }
    let payload_start = COMMON_FRAME_SIZE + 2;
    let payload_end = frame.byte_count as usize - 2;
    Ok(data[payload_start..payload_end].to_vec())
}
