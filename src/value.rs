//! The runtime value model shared by every CQL column type.

use std::net::IpAddr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use uuid::Uuid;

/// A decoded or to-be-encoded CQL column value.
///
/// Absence (a CQL `NULL`) is represented at this layer by `Option<Value>`, not
/// by a variant of `Value` itself; only the wire-level `bytes` primitive knows
/// about the `-1`-length sentinel that represents it on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Ascii(String),
    BigInt(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Counter(i64),
    Decimal(BigDecimal),
    Double(f64),
    Float(f32),
    Int(i32),
    Text(String),
    Timestamp(i64),
    Uuid(Uuid),
    Varchar(String),
    Varint(BigInt),
    TimeUuid(Uuid),
    Inet(IpAddr),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Custom(Vec<u8>),
}

impl Value {
    /// A short, human-readable name of this value's runtime shape, used in
    /// validation error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Ascii(_) => "ascii",
            Value::BigInt(_) => "bigint",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
            Value::Counter(_) => "counter",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Varchar(_) => "varchar",
            Value::Varint(_) => "varint",
            Value::TimeUuid(_) => "timeuuid",
            Value::Inet(_) => "inet",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Custom(_) => "custom",
        }
    }
}
