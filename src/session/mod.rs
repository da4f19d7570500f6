//! Sessions: dialing the cluster and selecting a database
//!
//! [`Session::dial_with_info`] is the driver entry point. It knows nothing
//! about TLS; encryption is layered in through [`DialInfo::dial_server`],
//! typically with [`tls_dial_server`].

mod addr;
mod database;
mod dial;

pub use addr::ServerAddr;
pub use database::{Database, Session};
pub use dial::{tls_dial_server, DialInfo, DialServer};
