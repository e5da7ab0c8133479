//! Standalone encoding and decoding of the Cassandra CQL v1/v2 native wire
//! protocol: frame headers and primitives, the column type registry, column
//! metadata, and result sets. Not a driver: no connection pooling, routing,
//! or retry policy lives here. See [`client`] for a minimal illustrative
//! collaborator that drives the codec over a real socket.

pub mod client;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod opcode;
pub mod result;
pub mod types;
pub mod value;

pub use client::{Client, ConnectOptions, QueryOutcome};
pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader, ParseOutcome};
pub use metadata::{ColumnDescriptor, ColumnMetadata};
pub use opcode::{Consistency, HeaderFlags, MetadataFlags, Opcode, ProtocolVersion, ResultKind};
pub use result::{ResultSet, RowKey};
pub use types::TypeDescriptor;
pub use value::Value;
