//! Transport abstraction (plain TCP vs TLS-encrypted TCP)

use crate::session::ServerAddr;
use crate::{Error, Result};
use bytes::BytesMut;
use rustls::ClientConfig;
use rustls_pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Transport layer abstraction
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP connection
    Plain(TcpStream),
    /// TLS-encrypted TCP connection
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain(TcpStream)"),
            Transport::Tls(_) => f.write_str("Transport::Tls(TlsStream)"),
        }
    }
}

impl Transport {
    /// Connect via plain TCP
    pub async fn connect_tcp(addr: &ServerAddr) -> Result<Self> {
        let stream = open_tcp(addr).await?;
        Ok(Transport::Plain(stream))
    }

    /// Connect via TCP and perform a TLS handshake on the raw socket.
    ///
    /// The host part of `addr` is used both for SNI and for verifying the
    /// server certificate, so IP literals must appear in the certificate's
    /// subject alternative names.
    pub async fn connect_tls(addr: &ServerAddr, client_config: Arc<ClientConfig>) -> Result<Self> {
        let server_name = ServerName::try_from(addr.host().to_string())
            .map_err(|_| Error::InvalidAddress(addr.to_string()))?;

        let tcp_stream = open_tcp(addr).await?;

        let tls_connector = tokio_rustls::TlsConnector::from(client_config);
        let tls_stream = tls_connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| Error::Handshake(format!("{}: {}", addr, e)))?;

        let (_, conn) = tls_stream.get_ref();
        tracing::debug!(
            server = %addr,
            version = ?conn.protocol_version(),
            "TLS connection established"
        );

        Ok(Transport::Tls(tls_stream))
    }

    /// Whether the stream is TLS-encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Write bytes to the transport
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.write_all(buf).await?,
            Transport::Tls(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    /// Flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush().await?,
            Transport::Tls(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Read bytes into buffer
    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Transport::Plain(stream) => stream.read_buf(buf).await?,
            Transport::Tls(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }
}

async fn open_tcp(addr: &ServerAddr) -> Result<TcpStream> {
    let stream = TcpStream::connect((addr.host(), addr.port())).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
