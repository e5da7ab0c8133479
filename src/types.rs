//! The type registry: one [`TypeDescriptor`] per CQL column type, each a total
//! `validate` / `encode` / `decode` triple.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::value::Value;

/// Numeric type codes as they appear on the wire (§3/§4.2 of the column-type grammar).
mod code {
    pub const CUSTOM: u16 = 0x0000;
    pub const ASCII: u16 = 0x0001;
    pub const BIGINT: u16 = 0x0002;
    pub const BLOB: u16 = 0x0003;
    pub const BOOLEAN: u16 = 0x0004;
    pub const COUNTER: u16 = 0x0005;
    pub const DECIMAL: u16 = 0x0006;
    pub const DOUBLE: u16 = 0x0007;
    pub const FLOAT: u16 = 0x0008;
    pub const INT: u16 = 0x0009;
    pub const TEXT: u16 = 0x000A;
    pub const TIMESTAMP: u16 = 0x000B;
    pub const UUID: u16 = 0x000C;
    pub const VARCHAR: u16 = 0x000D;
    pub const VARINT: u16 = 0x000E;
    pub const TIMEUUID: u16 = 0x000F;
    pub const INET: u16 = 0x0010;
    pub const LIST: u16 = 0x0020;
    pub const MAP: u16 = 0x0021;
    pub const SET: u16 = 0x0022;
}

/// A single CQL column type: scalar primitives, the three parametric
/// containers, and an opaque `custom` escape hatch.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Text,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    TimeUuid,
    Inet,
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Custom(String),
}

impl TypeDescriptor {
    /// Reads a type descriptor (and, for parametric types, its parameters)
    /// from the front of `frame`.
    pub fn read_type(frame: &mut Frame) -> Result<TypeDescriptor> {
        let tc = frame.unpack_short()?;
        Ok(match tc {
            code::CUSTOM => TypeDescriptor::Custom(frame.unpack_string()?),
            code::ASCII => TypeDescriptor::Ascii,
            code::BIGINT => TypeDescriptor::BigInt,
            code::BLOB => TypeDescriptor::Blob,
            code::BOOLEAN => TypeDescriptor::Boolean,
            code::COUNTER => TypeDescriptor::Counter,
            code::DECIMAL => TypeDescriptor::Decimal,
            code::DOUBLE => TypeDescriptor::Double,
            code::FLOAT => TypeDescriptor::Float,
            code::INT => TypeDescriptor::Int,
            code::TEXT => TypeDescriptor::Text,
            code::TIMESTAMP => TypeDescriptor::Timestamp,
            code::UUID => TypeDescriptor::Uuid,
            code::VARCHAR => TypeDescriptor::Varchar,
            code::VARINT => TypeDescriptor::Varint,
            code::TIMEUUID => TypeDescriptor::TimeUuid,
            code::INET => TypeDescriptor::Inet,
            code::LIST => TypeDescriptor::List(Box::new(TypeDescriptor::read_type(frame)?)),
            code::SET => TypeDescriptor::Set(Box::new(TypeDescriptor::read_type(frame)?)),
            code::MAP => {
                let key = TypeDescriptor::read_type(frame)?;
                let value = TypeDescriptor::read_type(frame)?;
                TypeDescriptor::Map(Box::new(key), Box::new(value))
            }
            other => return Err(Error::malformed(format!("unknown type code 0x{other:04x}"))),
        })
    }

    /// A human-readable name, used in validation failure messages.
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Ascii => "ascii".into(),
            TypeDescriptor::BigInt => "bigint".into(),
            TypeDescriptor::Blob => "blob".into(),
            TypeDescriptor::Boolean => "boolean".into(),
            TypeDescriptor::Counter => "counter".into(),
            TypeDescriptor::Decimal => "decimal".into(),
            TypeDescriptor::Double => "double".into(),
            TypeDescriptor::Float => "float".into(),
            TypeDescriptor::Int => "int".into(),
            TypeDescriptor::Text => "text".into(),
            TypeDescriptor::Timestamp => "timestamp".into(),
            TypeDescriptor::Uuid => "uuid".into(),
            TypeDescriptor::Varchar => "varchar".into(),
            TypeDescriptor::Varint => "varint".into(),
            TypeDescriptor::TimeUuid => "timeuuid".into(),
            TypeDescriptor::Inet => "inet".into(),
            TypeDescriptor::List(inner) => format!("list<{}>", inner.name()),
            TypeDescriptor::Set(inner) => format!("set<{}>", inner.name()),
            TypeDescriptor::Map(k, v) => format!("map<{}, {}>", k.name(), v.name()),
            TypeDescriptor::Custom(name) => name.clone(),
        }
    }

    /// Returns `Some(reason)` when `value` cannot be encoded as this type.
    pub fn validate(&self, value: &Value) -> Option<String> {
        use TypeDescriptor::*;
        match (self, value) {
            (Ascii, Value::Ascii(s)) => {
                if s.bytes().all(|b| b.is_ascii()) {
                    None
                } else {
                    Some("ascii value contains non-ASCII bytes".to_string())
                }
            }
            (BigInt, Value::BigInt(_)) => None,
            (Blob, Value::Blob(_)) => None,
            (Boolean, Value::Boolean(_)) => None,
            (Counter, Value::Counter(_)) => None,
            (Decimal, Value::Decimal(_)) => None,
            (Double, Value::Double(_)) => None,
            (Float, Value::Float(_)) => None,
            (Int, Value::Int(_)) => None,
            (Text, Value::Text(_)) => None,
            (Timestamp, Value::Timestamp(_)) => None,
            (Uuid, Value::Uuid(_)) => None,
            (Varchar, Value::Varchar(_)) => None,
            (Varint, Value::Varint(_)) => None,
            (TimeUuid, Value::TimeUuid(_)) => None,
            (Inet, Value::Inet(_)) => None,
            (Custom(_), Value::Custom(_)) => None,
            (List(inner), Value::List(items)) | (Set(inner), Value::Set(items)) => {
                items.iter().find_map(|item| inner.validate(item))
            }
            (Map(kt, vt), Value::Map(entries)) => entries.iter().find_map(|(k, v)| {
                kt.validate(k).or_else(|| vt.validate(v))
            }),
            (expected, got) => Some(format!(
                "expected a {} value, got {}",
                expected.name(),
                got.kind_name()
            )),
        }
    }

    /// Encodes `value` to its CQL wire bytes. Callers must have already
    /// checked [`TypeDescriptor::validate`].
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        use TypeDescriptor::*;
        Ok(match (self, value) {
            (Ascii, Value::Ascii(s)) | (Text, Value::Text(s)) | (Varchar, Value::Varchar(s)) => {
                s.as_bytes().to_vec()
            }
            (Blob, Value::Blob(b)) | (Custom(_), Value::Custom(b)) => b.clone(),
            (Boolean, Value::Boolean(b)) => vec![if *b { 1 } else { 0 }],
            (BigInt, Value::BigInt(v))
            | (Counter, Value::Counter(v))
            | (Timestamp, Value::Timestamp(v)) => v.to_be_bytes().to_vec(),
            (Int, Value::Int(v)) => v.to_be_bytes().to_vec(),
            (Float, Value::Float(v)) => v.to_be_bytes().to_vec(),
            (Double, Value::Double(v)) => v.to_be_bytes().to_vec(),
            (Varint, Value::Varint(v)) => encode_varint(v),
            (Decimal, Value::Decimal(v)) => encode_decimal(v),
            (Uuid, Value::Uuid(v)) | (TimeUuid, Value::TimeUuid(v)) => v.as_bytes().to_vec(),
            (Inet, Value::Inet(addr)) => match addr {
                std::net::IpAddr::V4(v4) => v4.octets().to_vec(),
                std::net::IpAddr::V6(v6) => v6.octets().to_vec(),
            },
            (List(inner), Value::List(items)) | (Set(inner), Value::Set(items)) => {
                encode_collection(inner, items)?
            }
            (Map(kt, vt), Value::Map(entries)) => encode_map(kt, vt, entries)?,
            (expected, got) => {
                return Err(Error::EncodeError {
                    column: String::new(),
                    reason: format!(
                        "expected a {} value, got {}",
                        expected.name(),
                        got.kind_name()
                    ),
                })
            }
        })
    }

    /// Decodes `bytes` (the full contents of a non-absent `bytes`/`short
    /// bytes` wire value) into a [`Value`] of this type.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        use TypeDescriptor::*;
        Ok(match self {
            Ascii => Value::Ascii(decode_utf8(bytes)?),
            Text => Value::Text(decode_utf8(bytes)?),
            Varchar => Value::Varchar(decode_utf8(bytes)?),
            Blob => Value::Blob(bytes.to_vec()),
            Custom(_) => Value::Custom(bytes.to_vec()),
            Boolean => Value::Boolean(bytes.first().copied().unwrap_or(0) != 0),
            Int => Value::Int(fixed_i32(bytes)?),
            BigInt => Value::BigInt(fixed_i64(bytes)?),
            Counter => Value::Counter(fixed_i64(bytes)?),
            Timestamp => Value::Timestamp(fixed_i64(bytes)?),
            Float => Value::Float(f32::from_be_bytes(fixed::<4>(bytes)?)),
            Double => Value::Double(f64::from_be_bytes(fixed::<8>(bytes)?)),
            Varint => Value::Varint(decode_varint(bytes)),
            Decimal => Value::Decimal(decode_decimal(bytes)?),
            Uuid => Value::Uuid(decode_uuid(bytes)?),
            TimeUuid => Value::TimeUuid(decode_uuid(bytes)?),
            Inet => Value::Inet(decode_inet(bytes)?),
            List(inner) => Value::List(decode_collection(inner, bytes)?),
            Set(inner) => Value::Set(decode_collection(inner, bytes)?),
            Map(kt, vt) => Value::Map(decode_map(kt, vt, bytes)?),
        })
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| Error::malformed(e.to_string()))
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    if bytes.len() != N {
        return Err(Error::malformed(format!(
            "expected exactly {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    Ok(arr)
}

fn fixed_i32(bytes: &[u8]) -> Result<i32> {
    Ok(i32::from_be_bytes(fixed::<4>(bytes)?))
}

fn fixed_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(fixed::<8>(bytes)?))
}

fn encode_varint(v: &BigInt) -> Vec<u8> {
    if v == &BigInt::from(0) {
        return Vec::new();
    }
    v.to_signed_bytes_be()
}

fn decode_varint(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::from(0);
    }
    BigInt::from_signed_bytes_be(bytes)
}

fn encode_decimal(v: &BigDecimal) -> Vec<u8> {
    let (unscaled, scale) = v.as_bigint_and_exponent();
    let mut out = Vec::with_capacity(4);
    out.extend_from_slice(&(scale as i32).to_be_bytes());
    out.extend_from_slice(&encode_varint(&unscaled));
    out
}

fn decode_decimal(bytes: &[u8]) -> Result<BigDecimal> {
    if bytes.len() < 4 {
        return Err(Error::malformed("decimal value shorter than its scale prefix"));
    }
    let scale = i32::from_be_bytes(fixed::<4>(&bytes[..4])?);
    let unscaled = decode_varint(&bytes[4..]);
    Ok(BigDecimal::new(unscaled, scale as i64))
}

fn decode_uuid(bytes: &[u8]) -> Result<Uuid> {
    let arr = fixed::<16>(bytes)?;
    Ok(Uuid::from_bytes(arr))
}

fn decode_inet(bytes: &[u8]) -> Result<std::net::IpAddr> {
    match bytes.len() {
        4 => Ok(std::net::IpAddr::V4(std::net::Ipv4Addr::new(
            bytes[0], bytes[1], bytes[2], bytes[3],
        ))),
        16 => {
            let arr = fixed::<16>(bytes)?;
            Ok(std::net::IpAddr::V6(std::net::Ipv6Addr::from(arr)))
        }
        other => Err(Error::malformed(format!(
            "invalid inet column value length {other}"
        ))),
    }
}

fn encode_collection(inner: &TypeDescriptor, items: &[Value]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(items.len() as u16).to_be_bytes());
    for item in items {
        let encoded = inner.encode(item)?;
        out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        out.extend_from_slice(&encoded);
    }
    Ok(out)
}

fn decode_collection(inner: &TypeDescriptor, bytes: &[u8]) -> Result<Vec<Value>> {
    let mut frame = Frame::from_bytes(bytes.to_vec());
    let n = frame.unpack_short()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let element_bytes = frame.unpack_short_bytes()?;
        out.push(inner.decode(&element_bytes)?);
    }
    Ok(out)
}

fn encode_map(
    kt: &TypeDescriptor,
    vt: &TypeDescriptor,
    entries: &[(Value, Value)],
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (k, v) in entries {
        let ek = kt.encode(k)?;
        out.extend_from_slice(&(ek.len() as u16).to_be_bytes());
        out.extend_from_slice(&ek);
        let ev = vt.encode(v)?;
        out.extend_from_slice(&(ev.len() as u16).to_be_bytes());
        out.extend_from_slice(&ev);
    }
    Ok(out)
}

fn decode_map(
    kt: &TypeDescriptor,
    vt: &TypeDescriptor,
    bytes: &[u8],
) -> Result<Vec<(Value, Value)>> {
    let mut frame = Frame::from_bytes(bytes.to_vec());
    let n = frame.unpack_short()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let k_bytes = frame.unpack_short_bytes()?;
        let v_bytes = frame.unpack_short_bytes()?;
        out.push((kt.decode(&k_bytes)?, vt.decode(&v_bytes)?));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trip() {
        let t = TypeDescriptor::Int;
        let v = Value::Int(-100);
        assert!(t.validate(&v).is_none());
        let bytes = t.encode(&v).unwrap();
        assert_eq!(bytes, vec![0xff, 0xff, 0xff, 0x9c]);
        assert_eq!(t.decode(&bytes).unwrap(), v);
    }

    #[test]
    fn ascii_rejects_non_ascii() {
        let t = TypeDescriptor::Ascii;
        let v = Value::Ascii("sandvi\u{109}on".to_string());
        assert!(t.validate(&v).is_some());
    }

    #[test]
    fn varint_zero_is_empty() {
        let t = TypeDescriptor::Varint;
        let v = Value::Varint(BigInt::from(0));
        assert_eq!(t.encode(&v).unwrap(), Vec::<u8>::new());
        assert_eq!(t.decode(&[]).unwrap(), v);
    }

    #[test]
    fn varint_negative_round_trip() {
        let t = TypeDescriptor::Varint;
        let v = Value::Varint(BigInt::from(-129));
        let bytes = t.encode(&v).unwrap();
        assert_eq!(t.decode(&bytes).unwrap(), v);
    }

    #[test]
    fn decimal_round_trip() {
        let t = TypeDescriptor::Decimal;
        let v = Value::Decimal(BigDecimal::new(BigInt::from(12345), 2));
        let bytes = t.encode(&v).unwrap();
        assert_eq!(t.decode(&bytes).unwrap(), v);
    }

    #[test]
    fn inet_rejects_bad_length() {
        let t = TypeDescriptor::Inet;
        assert!(t.decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn list_of_int_round_trip() {
        let t = TypeDescriptor::List(Box::new(TypeDescriptor::Int));
        let v = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(t.validate(&v).is_none());
        let bytes = t.encode(&v).unwrap();
        assert_eq!(t.decode(&bytes).unwrap(), v);
    }

    #[test]
    fn map_round_trip() {
        let t = TypeDescriptor::Map(Box::new(TypeDescriptor::Text), Box::new(TypeDescriptor::Int));
        let v = Value::Map(vec![
            (Value::Text("a".into()), Value::Int(1)),
            (Value::Text("b".into()), Value::Int(2)),
        ]);
        let bytes = t.encode(&v).unwrap();
        assert_eq!(t.decode(&bytes).unwrap(), v);
    }

    #[test]
    fn read_type_recursive_list() {
        let mut frame = Frame::new();
        frame.pack_short(0x0020); // list
        frame.pack_short(0x0009); // int
        let t = TypeDescriptor::read_type(&mut frame).unwrap();
        assert_eq!(t, TypeDescriptor::List(Box::new(TypeDescriptor::Int)));
    }
}
