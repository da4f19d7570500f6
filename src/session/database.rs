//! Session and database handles

use super::addr::ServerAddr;
use super::dial::DialInfo;
use crate::connection::{Connection, ServerInfo};
use crate::{Error, Result};
use bson::{doc, Document};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::Instrument;

/// An established connection to one server of the cluster.
///
/// Cheap to clone; clones share the underlying socket. The socket is
/// released when the last clone (including any [`Database`] derived from it)
/// is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    server: ServerAddr,
    info: ServerInfo,
    encrypted: bool,
    // One request in flight at a time; replies are matched by request id.
    conn: Mutex<Connection>,
}

impl Session {
    /// Dial the cluster described by `info`.
    ///
    /// Every address is dialed at once, a single attempt each; the first
    /// server to complete the handshake is kept and the other dials are
    /// dropped. The whole attempt is bounded by `info.timeout`.
    ///
    /// # Errors
    ///
    /// * [`Error::NoReachableServers`] when `info.addrs` is empty
    /// * [`Error::Timeout`] when the timeout expires first
    /// * otherwise the error from the last server to fail
    pub async fn dial_with_info(info: &DialInfo) -> Result<Session> {
        if info.addrs.is_empty() {
            return Err(Error::NoReachableServers);
        }

        let start = Instant::now();
        let session = tokio::time::timeout(info.timeout, Self::dial_servers(info))
            .await
            .map_err(|_| Error::Timeout(info.timeout))??;
        crate::metrics::histograms::dial_duration(start.elapsed().as_millis() as u64);

        Ok(session)
    }

    async fn dial_servers(info: &DialInfo) -> Result<Session> {
        let mut pending: FuturesUnordered<_> = info
            .addrs
            .iter()
            .map(|raw| {
                async move {
                    let result = Self::dial_server(info, raw).await;
                    if let Err(e) = &result {
                        tracing::debug!(server = %raw, error = %e, "server unreachable");
                    }
                    result
                }
                .instrument(tracing::debug_span!("dial_server", server = %raw))
            })
            .collect();

        let mut last_err = Error::NoReachableServers;
        while let Some(result) = pending.next().await {
            match result {
                Ok(session) => return Ok(session),
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }

    async fn dial_server(info: &DialInfo, raw: &str) -> Result<Session> {
        let server: ServerAddr = raw.parse()?;
        let transport = info.dial(server.clone()).await?;
        let mut conn = Connection::new(transport);
        let server_info = conn.handshake(info.app_name.as_deref()).await?;
        Ok(Session {
            inner: Arc::new(SessionInner {
                server,
                info: server_info,
                encrypted: conn.is_encrypted(),
                conn: Mutex::new(conn),
            }),
        })
    }

    /// Handle to the database `name` on this session
    pub fn db(&self, name: impl Into<String>) -> Database {
        Database {
            name: name.into(),
            session: self.clone(),
        }
    }

    /// Address of the server that answered
    pub fn server(&self) -> &ServerAddr {
        &self.inner.server
    }

    /// Handshake reply from that server
    pub fn server_info(&self) -> &ServerInfo {
        &self.inner.info
    }

    /// Whether the connection is TLS-encrypted
    pub fn is_encrypted(&self) -> bool {
        self.inner.encrypted
    }

    /// Round-trip a `ping` to the server
    pub async fn ping(&self) -> Result<()> {
        self.run_command(crate::protocol::constants::ADMIN_DB, doc! { "ping": 1 })
            .await
            .map(|_| ())
    }

    async fn run_command(&self, db: &str, mut command: Document) -> Result<Document> {
        command.insert("$db", db);
        self.inner.conn.lock().await.command(command).await
    }
}

/// A session scoped to one named database
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    session: Session,
}

impl Database {
    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session this handle was selected from
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run `command` against this database and return the server's reply.
    ///
    /// A reply with `ok: 0` comes back as [`Error::Server`].
    ///
    /// Commands share one connection. If this future is dropped while the
    /// request is still being written, the connection is left with a partial
    /// frame and every later command on the session fails with
    /// [`Error::Interrupted`]; dial a new session in that case.
    pub async fn run_command(&self, command: Document) -> Result<Document> {
        self.session.run_command(&self.name, command).await
    }
}
