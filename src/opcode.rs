//! Opcodes, protocol versions, and header/metadata flags for the CQL native protocol.

use std::convert::TryFrom;

use bitflags::bitflags;

use crate::error::Error;

/// The single byte identifying a CQL message's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Credentials = 0x04,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Event = 0x0C,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(b: u8) -> Result<Self, Error> {
        Ok(match b {
            0x00 => Opcode::Error,
            0x01 => Opcode::Startup,
            0x02 => Opcode::Ready,
            0x03 => Opcode::Authenticate,
            0x04 => Opcode::Credentials,
            0x05 => Opcode::Options,
            0x06 => Opcode::Supported,
            0x07 => Opcode::Query,
            0x08 => Opcode::Result,
            0x09 => Opcode::Prepare,
            0x0A => Opcode::Execute,
            0x0B => Opcode::Register,
            0x0C => Opcode::Event,
            other => return Err(Error::Protocol(format!("unknown opcode 0x{other:02x}"))),
        })
    }
}

/// Sub-code carried by a `RESULT` frame's body, identifying its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResultKind {
    Void = 0x0001,
    Rows = 0x0002,
    SetKeyspace = 0x0003,
    Prepared = 0x0004,
    SchemaChange = 0x0005,
}

impl TryFrom<i32> for ResultKind {
    type Error = Error;

    fn try_from(v: i32) -> Result<Self, Error> {
        Ok(match v {
            0x0001 => ResultKind::Void,
            0x0002 => ResultKind::Rows,
            0x0003 => ResultKind::SetKeyspace,
            0x0004 => ResultKind::Prepared,
            0x0005 => ResultKind::SchemaChange,
            other => return Err(Error::Protocol(format!("unknown result kind {other:#x}"))),
        })
    }
}

/// Consistency level requested for a query; transparent to the codec itself but
/// exposed so callers don't have to fabricate the wire constant by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Consistency {
    Any = 0x00,
    One = 0x01,
    Two = 0x02,
    Three = 0x03,
    Quorum = 0x04,
    All = 0x05,
    LocalQuorum = 0x06,
    EachQuorum = 0x07,
}

impl TryFrom<u16> for Consistency {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self, Error> {
        Ok(match v {
            0x00 => Consistency::Any,
            0x01 => Consistency::One,
            0x02 => Consistency::Two,
            0x03 => Consistency::Three,
            0x04 => Consistency::Quorum,
            0x05 => Consistency::All,
            0x06 => Consistency::LocalQuorum,
            0x07 => Consistency::EachQuorum,
            other => return Err(Error::Protocol(format!("unknown consistency level {other:#x}"))),
        })
    }
}

/// Request/response byte pairs for the two protocol versions this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

impl ProtocolVersion {
    pub const fn request_byte(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 0x01,
            ProtocolVersion::V2 => 0x02,
        }
    }

    pub const fn response_byte(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 0x81,
            ProtocolVersion::V2 => 0x82,
        }
    }

    /// Parses either the request or response form of a version byte.
    pub fn from_wire_byte(b: u8) -> Result<Self, Error> {
        Ok(match b & 0x7F {
            0x01 => ProtocolVersion::V1,
            0x02 => ProtocolVersion::V2,
            other => {
                return Err(Error::Protocol(format!(
                    "unsupported protocol version 0x{other:02x}"
                )))
            }
        })
    }

    pub const fn is_response(byte: u8) -> bool {
        byte & 0x80 != 0
    }
}

bitflags! {
    /// Bit flags carried in byte 2 of the frame header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u8 {
        const COMPRESS = 0x01;
        const TRACE = 0x02;
    }
}

bitflags! {
    /// Bit flags carried in the `RESULT_ROWS` / `RESULT_PREPARED` metadata section.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MetadataFlags: i32 {
        const HAS_GLOBAL_TABLE_SPEC = 0x0001;
        const HAS_MORE_PAGES = 0x0002;
        const NO_METADATA = 0x0004;
    }
}
