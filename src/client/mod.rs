//! Client API: configuration and the connect entry point

mod config;
mod connector;

pub use config::{Config, ConfigError, DEFAULT_CONN_TIMEOUT_SECS};
pub use connector::connect;
