//! Error types

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a connect failure.
///
/// Callers deciding on a retry policy only need to know which side failed:
/// the local certificate material or the attempt to reach the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Certificate, key or CA material could not be loaded
    TlsConfig,
    /// The network dial or the server handshake failed
    Connection,
}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// TLS material is unreadable, malformed or inconsistent
    #[error("tls configuration error: {0}")]
    Tls(String),

    /// Network I/O error
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// No server completed the handshake before the dial timeout
    #[error("dial timed out after {0:?}")]
    Timeout(Duration),

    /// The server list was empty
    #[error("no reachable servers")]
    NoReachableServers,

    /// A server address could not be parsed
    #[error("invalid server address '{0}'")]
    InvalidAddress(String),

    /// TLS handshake with the server failed
    #[error("tls handshake failed: {0}")]
    Handshake(String),

    /// Malformed or unexpected wire message
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered a command with `ok: 0`
    #[error("server error {code}: {message}")]
    Server {
        /// Server error code (0 when absent)
        code: i32,
        /// Server error message
        message: String,
    },

    /// Connection closed by the peer mid-exchange
    #[error("connection closed")]
    ConnectionClosed,

    /// An earlier command was cancelled while its request was being written
    #[error("connection unusable after an interrupted write")]
    Interrupted,
}

impl Error {
    /// Which of the two failure classes this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Tls(_) => ErrorKind::TlsConfig,
            _ => ErrorKind::Connection,
        }
    }

    /// Whether the failure was caused by the dial timeout expiring
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Short label used for metrics
    pub(crate) fn category(&self) -> &'static str {
        match self {
            Error::Tls(_) => "tls_config",
            Error::Io(_) => "io",
            Error::Timeout(_) => "timeout",
            Error::NoReachableServers => "no_servers",
            Error::InvalidAddress(_) => "invalid_address",
            Error::Handshake(_) => "tls_handshake",
            Error::Protocol(_) => "protocol",
            Error::Server { .. } => "server",
            Error::ConnectionClosed => "closed",
            Error::Interrupted => "interrupted",
        }
    }
}
