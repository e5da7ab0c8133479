//! A minimal synchronous client used to exercise the codec end to end.
//!
//! This is illustrative, not a connection pool or driver: one TCP stream, one
//! request in flight at a time, no retries, no routing.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::frame::{self, Frame};
use crate::opcode::{Consistency, HeaderFlags, Opcode, ProtocolVersion, ResultKind};
use crate::result::ResultSet;

/// Connection parameters for [`Client::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub cql_version: String,
    pub protocol_version: ProtocolVersion,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            cql_version: "3.0.5".to_string(),
            protocol_version: ProtocolVersion::V2,
            username: None,
            password: None,
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }
}

/// The outcome of a successful `query`.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Void,
    Rows(ResultSet),
    SetKeyspace(String),
    SchemaChange {
        kind: String,
        keyspace: String,
        table: String,
    },
}

/// A single blocking connection to a CQL-speaking server.
pub struct Client {
    stream: TcpStream,
    options: ConnectOptions,
    next_stream_id: i8,
}

impl Client {
    /// Opens a TCP connection and performs the `STARTUP`/`READY` handshake.
    pub fn connect(addr: impl ToSocketAddrs, options: ConnectOptions) -> Result<Client> {
        let stream = TcpStream::connect(addr)?;
        let mut client = Client {
            stream,
            options,
            next_stream_id: 0,
        };
        client.startup()?;
        Ok(client)
    }

    fn allocate_stream_id(&mut self) -> i8 {
        let id = self.next_stream_id;
        self.next_stream_id = self.next_stream_id.wrapping_add(1);
        id
    }

    fn send_message(&mut self, opcode: Opcode, body: Frame) -> Result<(Opcode, Frame)> {
        let stream_id = self.allocate_stream_id();
        let wire = frame::build(
            self.options.protocol_version,
            HeaderFlags::empty(),
            stream_id,
            opcode,
            &body,
        );
        tracing::debug!(?opcode, stream_id, "sending frame");
        self.stream.write_all(&wire)?;

        let (header, mut response_body) = frame::recv(&mut self.stream)?;
        tracing::debug!(opcode = ?header.opcode, "received frame");

        if header.opcode == Opcode::Error {
            let code = response_body.unpack_int()?;
            let message = response_body.unpack_string()?;
            tracing::warn!(code, %message, "server returned an error frame");
            return Err(Error::Remote { code, message });
        }

        Ok((header.opcode, response_body))
    }

    fn startup(&mut self) -> Result<()> {
        let mut options = std::collections::HashMap::new();
        options.insert("CQL_VERSION".to_string(), self.options.cql_version.clone());

        let mut body = Frame::new();
        body.pack_string_map(&options);

        let (opcode, _) = self.send_message(Opcode::Startup, body)?;
        match opcode {
            Opcode::Ready => Ok(()),
            Opcode::Authenticate => self.authenticate(),
            other => Err(Error::Protocol(format!(
                "unexpected response to STARTUP: {other:?}"
            ))),
        }
    }

    fn authenticate(&mut self) -> Result<()> {
        let username = self
            .options
            .username
            .clone()
            .ok_or_else(|| Error::Protocol("server requires authentication".to_string()))?;
        let password = self.options.password.clone().unwrap_or_default();

        let mut body = Frame::new();
        body.pack_string(&username);
        body.pack_string(&password);

        let (opcode, _) = self.send_message(Opcode::Credentials, body)?;
        match opcode {
            Opcode::Ready => Ok(()),
            other => Err(Error::Protocol(format!(
                "unexpected response to CREDENTIALS: {other:?}"
            ))),
        }
    }

    /// Sends a `QUERY` message and decodes its `RESULT` response.
    pub fn query(&mut self, cql: &str, consistency: Consistency) -> Result<QueryOutcome> {
        let mut body = Frame::new();
        body.pack_long_string(cql);
        body.pack_short(consistency as u16);

        let (opcode, mut response) = self.send_message(Opcode::Query, body)?;
        if opcode != Opcode::Result {
            return Err(Error::Protocol(format!(
                "unexpected response to QUERY: {opcode:?}"
            )));
        }

        let kind = response.unpack_int()?;
        match ResultKind::try_from(kind)? {
            ResultKind::Void => Ok(QueryOutcome::Void),
            ResultKind::Rows => Ok(QueryOutcome::Rows(ResultSet::from_frame(
                &mut response,
                self.options.protocol_version,
            )?)),
            ResultKind::SetKeyspace => Ok(QueryOutcome::SetKeyspace(response.unpack_string()?)),
            ResultKind::SchemaChange => {
                let kind = response.unpack_string()?;
                let keyspace = response.unpack_string()?;
                let table = response.unpack_string()?;
                Ok(QueryOutcome::SchemaChange {
                    kind,
                    keyspace,
                    table,
                })
            }
            ResultKind::Prepared => Err(Error::Protocol(
                "unexpected RESULT_PREPARED in response to QUERY".to_string(),
            )),
        }
    }
}
