//! The byte-level frame buffer: wire primitives and message-header framing.

use std::collections::HashMap;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::opcode::{HeaderFlags, Opcode, ProtocolVersion};

const HEADER_LEN: usize = 8;

/// A mutable byte buffer with a read cursor at the front and an append point at
/// the end. Every `pack_*` method appends; every `unpack_*` method consumes from
/// the front and fails with [`Error::ShortBuffer`] if not enough bytes remain.
///
/// Backed by a [`BytesMut`] so consuming from the front (`split_to`) is O(1)
/// rather than a shift of the whole buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    buf: BytesMut,
}

impl Frame {
    /// An empty frame, ready to be packed into.
    pub fn new() -> Self {
        Frame {
            buf: BytesMut::new(),
        }
    }

    /// A frame initialised from an existing byte string, read cursor at 0.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Frame {
            buf: BytesMut::from(bytes.as_slice()),
        }
    }

    /// Bytes not yet consumed by an `unpack_*` call.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[..]
    }

    /// Number of unconsumed bytes.
    pub fn remaining_len(&self) -> usize {
        self.buf.len()
    }

    /// Consumes the frame and returns its full (unread-prefix-stripped) byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    fn require(&self, n: usize) -> Result<()> {
        if self.remaining_len() < n {
            Err(Error::ShortBuffer {
                needed: n,
                available: self.remaining_len(),
            })
        } else {
            Ok(())
        }
    }

    fn take(&mut self, n: usize) -> Result<BytesMut> {
        self.require(n)?;
        Ok(self.buf.split_to(n))
    }

    // -- short --------------------------------------------------------

    pub fn pack_short(&mut self, v: u16) {
        let mut tmp = [0u8; 2];
        BigEndian::write_u16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn unpack_short(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(BigEndian::read_u16(&bytes))
    }

    // -- int ------------------------------------------------------------

    pub fn pack_int(&mut self, v: i32) {
        let mut tmp = [0u8; 4];
        BigEndian::write_i32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn unpack_int(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(BigEndian::read_i32(&bytes))
    }

    // -- long -------------------------------------------------------------

    pub fn pack_long(&mut self, v: i64) {
        let mut tmp = [0u8; 8];
        BigEndian::write_i64(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn unpack_long(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        Ok(BigEndian::read_i64(&bytes))
    }

    // -- string -----------------------------------------------------------

    pub fn pack_string(&mut self, s: &str) {
        self.pack_short(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn unpack_string(&mut self) -> Result<String> {
        let len = self.unpack_short()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::malformed(e.to_string()))
    }

    // -- long string --------------------------------------------------------

    pub fn pack_long_string(&mut self, s: &str) {
        self.pack_int(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn unpack_long_string(&mut self) -> Result<String> {
        let len = self.unpack_int()?;
        if len < 0 {
            return Err(Error::malformed("negative long string length"));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::malformed(e.to_string()))
    }

    // -- uuid -----------------------------------------------------------------

    pub fn pack_uuid(&mut self, v: Uuid) {
        self.buf.extend_from_slice(v.as_bytes());
    }

    pub fn unpack_uuid(&mut self) -> Result<Uuid> {
        let bytes = self.take(16)?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Uuid::from_bytes(arr))
    }

    // -- string list ------------------------------------------------------------

    pub fn pack_string_list(&mut self, items: &[String]) {
        self.pack_short(items.len() as u16);
        for item in items {
            self.pack_string(item);
        }
    }

    pub fn unpack_string_list(&mut self) -> Result<Vec<String>> {
        let n = self.unpack_short()? as usize;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.unpack_string()?);
        }
        Ok(out)
    }

    // -- bytes (nullable) -------------------------------------------------------

    pub fn pack_bytes(&mut self, v: Option<&[u8]>) {
        match v {
            None => self.pack_int(-1),
            Some(b) => {
                self.pack_int(b.len() as i32);
                self.buf.extend_from_slice(b);
            }
        }
    }

    pub fn unpack_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.unpack_int()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }

    // -- short bytes ----------------------------------------------------------

    pub fn pack_short_bytes(&mut self, v: &[u8]) {
        self.pack_short(v.len() as u16);
        self.buf.extend_from_slice(v);
    }

    pub fn unpack_short_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.unpack_short()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    // -- inet -------------------------------------------------------------------

    pub fn pack_inet(&mut self, addr: SocketAddr) {
        match addr.ip() {
            IpAddr::V4(v4) => {
                self.buf.extend_from_slice(&[4]);
                self.buf.extend_from_slice(&v4.octets());
            }
            IpAddr::V6(v6) => {
                self.buf.extend_from_slice(&[16]);
                self.buf.extend_from_slice(&v6.octets());
            }
        }
        self.pack_int(addr.port() as i32);
    }

    pub fn unpack_inet(&mut self) -> Result<SocketAddr> {
        let len = self.take(1)?[0];
        let ip = match len {
            4 => {
                let b = self.take(4)?;
                IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            16 => {
                let b = self.take(16)?;
                let mut arr = [0u8; 16];
                arr.copy_from_slice(&b);
                IpAddr::V6(Ipv6Addr::from(arr))
            }
            other => {
                return Err(Error::malformed(format!(
                    "invalid inet address length {other}"
                )))
            }
        };
        let port = self.unpack_int()?;
        Ok(SocketAddr::new(ip, port as u16))
    }

    // -- string map ---------------------------------------------------------------

    pub fn pack_string_map(&mut self, map: &HashMap<String, String>) {
        let mut entries: Vec<(&String, &String)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        self.pack_short(entries.len() as u16);
        for (k, v) in entries {
            self.pack_string(k);
            self.pack_string(v);
        }
    }

    pub fn unpack_string_map(&mut self) -> Result<HashMap<String, String>> {
        let n = self.unpack_short()? as usize;
        let mut out = HashMap::with_capacity(n);
        for _ in 0..n {
            let k = self.unpack_string()?;
            let v = self.unpack_string()?;
            out.insert(k, v);
        }
        Ok(out)
    }
}

/// The 8-byte prefix of every CQL message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: ProtocolVersion,
    pub is_response: bool,
    pub flags: HeaderFlags,
    pub stream_id: i8,
    pub opcode: Opcode,
    pub body_length: i32,
}

/// Outcome of attempting to parse one frame out of a byte buffer that may not
/// yet hold a complete message.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Fewer bytes are available than the frame (or its header) requires.
    Incomplete,
    /// A full frame was parsed; `consumed` is the number of leading bytes of
    /// the input that made up this frame (header + body).
    Complete {
        header: FrameHeader,
        body: Frame,
        consumed: usize,
    },
}

/// Prepends an 8-byte header to `body`'s bytes and returns the full wire message.
pub fn build(
    version: ProtocolVersion,
    flags: HeaderFlags,
    stream_id: i8,
    opcode: Opcode,
    body: &Frame,
) -> Vec<u8> {
    let body_bytes = body.remaining();
    let mut out = Vec::with_capacity(HEADER_LEN + body_bytes.len());
    out.push(version.request_byte());
    out.push(flags.bits());
    out.push(stream_id as u8);
    out.push(opcode as u8);
    let mut len_buf = [0u8; 4];
    BigEndian::write_i32(&mut len_buf, body_bytes.len() as i32);
    out.extend_from_slice(&len_buf);
    out.extend_from_slice(body_bytes);
    out
}

/// Attempts to parse one frame (header + body) from the front of `input`,
/// without requiring a complete message to already be present.
pub fn parse(input: &[u8]) -> Result<ParseOutcome> {
    if input.len() < HEADER_LEN {
        return Ok(ParseOutcome::Incomplete);
    }

    let version_byte = input[0];
    let is_response = ProtocolVersion::is_response(version_byte);
    let version = ProtocolVersion::from_wire_byte(version_byte)?;
    let flags = HeaderFlags::from_bits_truncate(input[1]);
    let stream_id = input[2] as i8;
    let opcode = Opcode::try_from(input[3])?;
    let body_length = BigEndian::read_i32(&input[4..8]);
    if body_length < 0 {
        return Err(Error::malformed("negative body length"));
    }
    let body_length = body_length as usize;

    if input.len() < HEADER_LEN + body_length {
        return Ok(ParseOutcome::Incomplete);
    }

    let body = Frame::from_bytes(input[HEADER_LEN..HEADER_LEN + body_length].to_vec());

    Ok(ParseOutcome::Complete {
        header: FrameHeader {
            version,
            is_response,
            flags,
            stream_id,
            opcode,
            body_length: body_length as i32,
        },
        body,
        consumed: HEADER_LEN + body_length,
    })
}

/// Blocks reading exactly one frame (header, then its body) from `source`.
pub fn recv<R: Read>(source: &mut R) -> Result<(FrameHeader, Frame)> {
    let mut header_buf = [0u8; HEADER_LEN];
    source.read_exact(&mut header_buf)?;

    let version_byte = header_buf[0];
    let is_response = ProtocolVersion::is_response(version_byte);
    let version = ProtocolVersion::from_wire_byte(version_byte)?;
    let flags = HeaderFlags::from_bits_truncate(header_buf[1]);
    let stream_id = header_buf[2] as i8;
    let opcode = Opcode::try_from(header_buf[3])?;
    let body_length = BigEndian::read_i32(&header_buf[4..8]);
    if body_length < 0 {
        return Err(Error::malformed("negative body length"));
    }

    let mut body_buf = vec![0u8; body_length as usize];
    source.read_exact(&mut body_buf)?;

    tracing::trace!(?opcode, body_length, "received frame");

    Ok((
        FrameHeader {
            version,
            is_response,
            flags,
            stream_id,
            opcode,
            body_length,
        },
        Frame::from_bytes(body_buf),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_round_trip() {
        let mut f = Frame::new();
        f.pack_short(0x1234);
        assert_eq!(f.remaining(), &[0x12, 0x34]);
        assert_eq!(f.unpack_short().unwrap(), 0x1234);
    }

    #[test]
    fn int_negative_round_trip() {
        let mut f = Frame::new();
        f.pack_int(0x12345678);
        f.pack_int(-100);
        assert_eq!(
            f.remaining(),
            &[0x12, 0x34, 0x56, 0x78, 0xff, 0xff, 0xff, 0x9c]
        );
        assert_eq!(f.unpack_int().unwrap(), 0x12345678);
        assert_eq!(f.unpack_int().unwrap(), -100);
    }

    #[test]
    fn utf8_string_round_trip() {
        let mut f = Frame::new();
        f.pack_string("sandvi\u{109}on");
        assert_eq!(
            f.remaining(),
            &[0x00, 0x0a, 0x73, 0x61, 0x6e, 0x64, 0x76, 0x69, 0xc4, 0x89, 0x6f, 0x6e]
        );
        assert_eq!(f.unpack_string().unwrap(), "sandvi\u{109}on");
    }

    #[test]
    fn bytes_absent_round_trip() {
        let mut f = Frame::new();
        f.pack_bytes(Some(b"abcd"));
        f.pack_bytes(None);
        assert_eq!(
            f.remaining(),
            &[0x00, 0x00, 0x00, 0x04, 0x61, 0x62, 0x63, 0x64, 0xff, 0xff, 0xff, 0xff]
        );
        assert_eq!(f.unpack_bytes().unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(f.unpack_bytes().unwrap(), None);
    }

    #[test]
    fn bytes_zero_length_is_present() {
        let mut f = Frame::new();
        f.pack_bytes(Some(b""));
        assert_eq!(f.unpack_bytes().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn short_buffer_on_truncated_input() {
        let mut f = Frame::from_bytes(vec![0x00]);
        assert!(matches!(f.unpack_short(), Err(Error::ShortBuffer { .. })));
    }

    #[test]
    fn header_build_and_parse_round_trip() {
        let mut body = Frame::new();
        body.pack_int(0x01234567);
        let wire = build(
            ProtocolVersion::V2,
            HeaderFlags::empty(),
            1,
            Opcode::Result,
            &body,
        );
        assert_eq!(wire, vec![0x02, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x04, 0x01, 0x23, 0x45, 0x67]);
    }

    #[test]
    fn parse_complete_message_with_trailer() {
        let input = [
            0x81, 0x00, 0x01, 0x05, 0x00, 0x00, 0x00, 0x04, 0x01, 0x23, 0x45, 0x67, b'T', b'a',
            b'i', b'l',
        ];
        match parse(&input).unwrap() {
            ParseOutcome::Complete {
                header,
                mut body,
                consumed,
            } => {
                assert_eq!(header.version, ProtocolVersion::V1);
                assert!(header.is_response);
                assert_eq!(header.stream_id, 1);
                assert_eq!(header.opcode, Opcode::Options);
                assert_eq!(body.unpack_int().unwrap(), 0x01234567);
                assert_eq!(&input[consumed..], b"Tail");
            }
            ParseOutcome::Incomplete => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn parse_incomplete_reports_incomplete() {
        let input = [0x81, 0x00, 0x01, 0x05, 0x00, 0x00, 0x00, 0x04, 0x01];
        assert!(matches!(parse(&input).unwrap(), ParseOutcome::Incomplete));
    }

    #[test]
    fn string_map_is_deterministic() {
        let mut map = HashMap::new();
        map.insert("zeta".to_string(), "1".to_string());
        map.insert("alpha".to_string(), "2".to_string());
        map.insert("mu".to_string(), "3".to_string());

        let mut a = Frame::new();
        a.pack_string_map(&map);
        let mut b = Frame::new();
        b.pack_string_map(&map);
        assert_eq!(a.remaining(), b.remaining());

        let mut decoded = a;
        assert_eq!(decoded.unpack_string_map().unwrap(), map);
    }

    #[test]
    fn inet_rejects_bad_length() {
        let mut f = Frame::from_bytes(vec![5, 1, 2, 3, 4, 5]);
        assert!(matches!(f.unpack_inet(), Err(Error::Malformed(_))));
    }
}
