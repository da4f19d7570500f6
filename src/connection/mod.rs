//! Connection management
//!
//! This module handles:
//! * Transport abstraction (plain TCP vs TLS)
//! * TLS material loading for mutual TLS
//! * The single-connection handshake

mod conn;
mod tls;
mod transport;

pub use conn::{Connection, ServerInfo};
pub use tls::TlsSettings;
pub use transport::Transport;
