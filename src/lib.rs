//! mongo-connect: dial a MongoDB cluster once, optionally over mutual TLS,
//! and hand back a handle to a named database.
//!
//! The crate is deliberately narrow:
//!
//! * [`client::connect`] turns a [`Config`] into a [`Database`] handle
//! * [`connection::TlsSettings`] loads certificate, key and CA files into a rustls client config
//! * [`session`] carries the dial function and the connection handshake
//! * [`protocol`] frames `OP_MSG` messages on the wire
//!
//! There is no pooling, no query API beyond raw commands and no retry. The
//! caller owns the returned handle for as long as it needs the connection.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> mongo_connect::Result<()> {
//! use mongo_connect::{connect, Config};
//!
//! let config = Config::new(vec!["db-1.internal:27017".into()], "netlify");
//! let db = connect(&config, &tracing::Span::current()).await?;
//! println!("connected to {} on {}", db.name(), db.session().server());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod collections;
pub mod connection;
pub mod error;
mod metrics;
pub mod protocol;
pub mod session;

pub use client::{connect, Config, ConfigError};
pub use collections::Collection;
pub use error::{Error, ErrorKind, Result};
pub use session::{Database, Session};
