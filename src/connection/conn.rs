//! Core connection type

use super::transport::Transport;
use crate::protocol::constants::ADMIN_DB;
use crate::protocol::{decode_message, encode_message, OpMsg};
use crate::{Error, Result};
use bson::{doc, Bson, Document};
use bytes::{Buf, BytesMut};
use serde::Deserialize;
use std::io;
use std::sync::atomic::{AtomicI32, Ordering};

// Request ids only need to be unique per connection; a process-wide counter
// keeps them unique across connections too, which helps when reading server logs.
static REQUEST_ID: AtomicI32 = AtomicI32::new(1);

fn next_request_id() -> i32 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Server description returned by the connection handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// Whether the server accepts writes
    pub is_writable_primary: bool,
    /// Oldest wire protocol version the server speaks
    pub min_wire_version: i32,
    /// Newest wire protocol version the server speaks
    pub max_wire_version: i32,
    /// Replica set name, if the server is a replica set member
    pub set_name: Option<String>,
    /// `"isdbgrid"` when talking to a mongos router
    pub msg: Option<String>,
}

// Servers answer `isMaster` with `ismaster` and `hello` with
// `isWritablePrimary`; some versions send both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeReply {
    #[serde(default)]
    is_writable_primary: Option<bool>,
    #[serde(default, rename = "ismaster")]
    is_master: Option<bool>,
    #[serde(default)]
    min_wire_version: i32,
    #[serde(default)]
    max_wire_version: i32,
    #[serde(default)]
    set_name: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl From<HandshakeReply> for ServerInfo {
    fn from(reply: HandshakeReply) -> Self {
        Self {
            is_writable_primary: reply
                .is_writable_primary
                .or(reply.is_master)
                .unwrap_or(false),
            min_wire_version: reply.min_wire_version,
            max_wire_version: reply.max_wire_version,
            set_name: reply.set_name,
            msg: reply.msg,
        }
    }
}

impl ServerInfo {
    /// Whether the server is a mongos router
    pub fn is_mongos(&self) -> bool {
        self.msg.as_deref() == Some("isdbgrid")
    }
}

/// A single MongoDB connection
pub struct Connection {
    transport: Transport,
    read_buf: BytesMut,
    // Set while a request is being written; still set afterwards means the
    // write was cancelled and the stream holds a partial frame.
    write_pending: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.transport)
            .field("write_pending", &self.write_pending)
            .finish()
    }
}

impl Connection {
    /// Create connection from transport
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            read_buf: BytesMut::with_capacity(8192),
            write_pending: false,
        }
    }

    /// Whether the underlying stream is TLS-encrypted
    pub fn is_encrypted(&self) -> bool {
        self.transport.is_encrypted()
    }

    /// Run the initial `isMaster` exchange and describe the server.
    ///
    /// `app_name` is reported in the client metadata so it shows up in the
    /// server's logs and `currentOp` output.
    pub async fn handshake(&mut self, app_name: Option<&str>) -> Result<ServerInfo> {
        let mut command = doc! {
            "isMaster": 1,
            "helloOk": true,
            "client": client_metadata(app_name),
        };
        command.insert("$db", ADMIN_DB);

        let reply = self.command(command).await?;
        let info: ServerInfo = bson::from_document::<HandshakeReply>(reply)
            .map_err(|e| Error::Protocol(format!("malformed handshake reply: {}", e)))?
            .into();

        tracing::debug!(
            max_wire_version = info.max_wire_version,
            writable_primary = info.is_writable_primary,
            "handshake complete"
        );
        Ok(info)
    }

    /// Send a command and wait for its reply.
    ///
    /// Replies with `ok: 0` are turned into [`Error::Server`].
    pub async fn command(&mut self, body: Document) -> Result<Document> {
        let request_id = next_request_id();
        self.send_message(&OpMsg::request(request_id, body)).await?;

        loop {
            let reply = self.receive_message().await?;
            if reply.response_to != request_id {
                tracing::debug!(
                    expected = request_id,
                    got = reply.response_to,
                    "discarding reply to another request"
                );
                continue;
            }
            return check_ok(reply.body);
        }
    }

    /// Send a message
    async fn send_message(&mut self, msg: &OpMsg) -> Result<()> {
        if self.write_pending {
            return Err(Error::Interrupted);
        }
        let buf = encode_message(msg)?;

        self.write_pending = true;
        self.transport.write_all(&buf).await?;
        self.transport.flush().await?;
        self.write_pending = false;
        Ok(())
    }

    /// Receive a message
    async fn receive_message(&mut self) -> Result<OpMsg> {
        loop {
            match decode_message(&self.read_buf) {
                Ok((msg, consumed)) => {
                    self.read_buf.advance(consumed);
                    return Ok(msg);
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                Err(e) => return Err(Error::Protocol(e.to_string())),
            }

            // Need more data
            let n = self.transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

fn client_metadata(app_name: Option<&str>) -> Document {
    let mut metadata = doc! {
        "driver": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "os": {
            "type": std::env::consts::OS,
            "architecture": std::env::consts::ARCH,
        },
    };
    if let Some(name) = app_name {
        metadata.insert("application", doc! { "name": name });
    }
    metadata
}

fn check_ok(body: Document) -> Result<Document> {
    let ok = match body.get("ok") {
        Some(Bson::Double(v)) => *v == 1.0,
        Some(Bson::Int32(v)) => *v == 1,
        Some(Bson::Int64(v)) => *v == 1,
        Some(Bson::Boolean(v)) => *v,
        _ => false,
    };
    if ok {
        return Ok(body);
    }

    let code = match body.get("code") {
        Some(Bson::Int32(c)) => *c,
        Some(Bson::Int64(c)) => i32::try_from(*c).unwrap_or_default(),
        Some(Bson::Double(c)) => *c as i32,
        _ => 0,
    };
    let message = body
        .get_str("errmsg")
        .unwrap_or("command failed without errmsg")
        .to_string();
    Err(Error::Server { code, message })
}
