//! Connector configuration
//!
//! Field names follow the keys used in service config files:
//!
//! ```json
//! {
//!   "servers": ["db-1.internal:27017", "db-2.internal:27017"],
//!   "db": "netlify",
//!   "conn_timeout": 5,
//!   "tls_conf": {
//!     "cert_file": "/etc/mongo/client.pem",
//!     "key_file": "/etc/mongo/client.key",
//!     "ca_files": ["/etc/mongo/ca.pem"]
//!   }
//! }
//! ```

use crate::connection::TlsSettings;
use crate::session::DialInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Dial timeout used when none is configured, in seconds
pub const DEFAULT_CONN_TIMEOUT_SECS: u64 = 10;

fn default_conn_timeout() -> u64 {
    DEFAULT_CONN_TIMEOUT_SECS
}

/// Errors raised while loading or validating a [`Config`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A value could not be parsed
    #[error("failed to parse {key}: {details}")]
    ParseError {
        /// Variable or field name
        key: String,
        /// Parser message
        details: String,
    },

    /// The configuration is structurally invalid
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// TLS material; `None` connects in plaintext
    #[serde(rename = "tls_conf", default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSettings>,

    /// Database to select once connected
    pub db: String,

    /// Seed addresses (`host[:port]`), tried in order
    pub servers: Vec<String>,

    /// Dial timeout in seconds
    #[serde(default = "default_conn_timeout")]
    pub conn_timeout: u64,

    /// Application name reported to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl Config {
    /// Plaintext configuration with the default timeout
    pub fn new(servers: Vec<String>, db: impl Into<String>) -> Self {
        Self {
            tls: None,
            db: db.into(),
            servers,
            conn_timeout: DEFAULT_CONN_TIMEOUT_SECS,
            app_name: None,
        }
    }

    /// Connect over TLS with the given material
    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the dial timeout in seconds
    pub fn with_conn_timeout(mut self, secs: u64) -> Self {
        self.conn_timeout = secs;
        self
    }

    /// Set the application name reported to the server
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Dial timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.conn_timeout)
    }

    /// Check the invariants the connector relies on.
    ///
    /// [`connect`](super::connect) does not call this; config loaders do.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "servers must list at least one address".into(),
            ));
        }
        if self.db.is_empty() {
            return Err(ConfigError::Invalid("db must not be empty".into()));
        }
        if self.conn_timeout == 0 {
            return Err(ConfigError::Invalid(
                "conn_timeout must be greater than zero".into(),
            ));
        }
        if let Some(tls) = &self.tls {
            if tls.cert_file.is_empty() != tls.key_file.is_empty() {
                return Err(ConfigError::Invalid(
                    "tls_conf.cert_file and tls_conf.key_file must be set together".into(),
                ));
            }
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MONGO_SERVERS` (required) - comma-separated `host[:port]` list
    /// - `MONGO_DB` (required) - database name
    /// - `MONGO_CONN_TIMEOUT` (optional, default: 10) - dial timeout in seconds
    /// - `MONGO_APP_NAME` (optional) - application name reported to the server
    /// - `MONGO_TLS_CERT_FILE`, `MONGO_TLS_KEY_FILE` (optional) - client identity
    /// - `MONGO_TLS_CA_FILES` (optional) - comma-separated CA bundle paths
    ///
    /// TLS is enabled when any of the `MONGO_TLS_*` variables is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let servers = split_list(&required_var("MONGO_SERVERS")?);
        let db = required_var("MONGO_DB")?;

        let conn_timeout = match std::env::var("MONGO_CONN_TIMEOUT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::ParseError {
                key: "MONGO_CONN_TIMEOUT".to_string(),
                details: format!("{}", e),
            })?,
            Err(_) => DEFAULT_CONN_TIMEOUT_SECS,
        };

        let app_name = std::env::var("MONGO_APP_NAME").ok();

        let cert_file = std::env::var("MONGO_TLS_CERT_FILE").ok();
        let key_file = std::env::var("MONGO_TLS_KEY_FILE").ok();
        let ca_files = std::env::var("MONGO_TLS_CA_FILES").ok();
        let tls = if cert_file.is_some() || key_file.is_some() || ca_files.is_some() {
            Some(TlsSettings {
                cert_file: cert_file.unwrap_or_default(),
                key_file: key_file.unwrap_or_default(),
                ca_files: ca_files.as_deref().map(split_list).unwrap_or_default(),
            })
        } else {
            None
        };

        let config = Self {
            tls,
            db,
            servers,
            conn_timeout,
            app_name,
        };
        config.validate()?;
        Ok(config)
    }

    /// Step one of a connect: dial parameters without any TLS hook installed
    pub(crate) fn dial_info(&self) -> DialInfo {
        let mut info = DialInfo::new(self.servers.clone(), self.timeout());
        info.app_name = self.app_name.clone();
        info
    }
}

fn required_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = Config::new(vec!["localhost:27017".into()], "netlify");
        assert_eq!(config.db, "netlify");
        assert_eq!(config.conn_timeout, DEFAULT_CONN_TIMEOUT_SECS);
        assert!(config.tls.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_fluent() {
        let config = Config::new(vec!["a:1".into()], "db")
            .with_conn_timeout(3)
            .with_app_name("billing")
            .with_tls(TlsSettings::new("c.pem", "k.pem"));

        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.app_name.as_deref(), Some("billing"));
        assert!(config.tls.as_ref().unwrap().has_client_identity());
    }

    #[test]
    fn test_dial_info_from_config() {
        let config = Config::new(vec!["a:1".into(), "b:2".into()], "db")
            .with_conn_timeout(7)
            .with_app_name("svc");
        let info = config.dial_info();

        assert_eq!(info.addrs, vec!["a:1", "b:2"]);
        assert_eq!(info.timeout, Duration::from_secs(7));
        assert_eq!(info.app_name.as_deref(), Some("svc"));
        assert!(info.dial_server.is_none());
    }

    #[test]
    fn test_deserialize_config_file_keys() {
        let config: Config = serde_json::from_str(
            r#"{
                "servers": ["db-1:27017", "db-2:27017"],
                "db": "netlify",
                "conn_timeout": 5,
                "tls_conf": {
                    "cert_file": "/etc/mongo/client.pem",
                    "key_file": "/etc/mongo/client.key",
                    "ca_files": ["/etc/mongo/ca.pem"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.servers, vec!["db-1:27017", "db-2:27017"]);
        assert_eq!(config.conn_timeout, 5);
        let tls = config.tls.unwrap();
        assert_eq!(tls.ca_files, vec!["/etc/mongo/ca.pem"]);
    }

    #[test]
    fn test_deserialize_without_tls_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"servers": ["localhost"], "db": "test"}"#).unwrap();
        assert!(config.tls.is_none());
        assert_eq!(config.conn_timeout, DEFAULT_CONN_TIMEOUT_SECS);

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("tls_conf").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = Config::new(vec!["localhost".into()], "db");

        let mut no_servers = base.clone();
        no_servers.servers = vec![" ".into()];
        assert!(matches!(no_servers.validate(), Err(ConfigError::Invalid(_))));

        let mut no_db = base.clone();
        no_db.db.clear();
        assert!(matches!(no_db.validate(), Err(ConfigError::Invalid(_))));

        let zero_timeout = base.clone().with_conn_timeout(0);
        assert!(matches!(zero_timeout.validate(), Err(ConfigError::Invalid(_))));

        let half_identity = base.with_tls(TlsSettings {
            cert_file: "c.pem".into(),
            ..TlsSettings::default()
        });
        assert!(matches!(half_identity.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("MONGO_SERVERS", Some("db-1:27017, db-2:27017")),
                ("MONGO_DB", Some("netlify")),
                ("MONGO_CONN_TIMEOUT", Some("4")),
                ("MONGO_APP_NAME", None),
                ("MONGO_TLS_CERT_FILE", None),
                ("MONGO_TLS_KEY_FILE", None),
                ("MONGO_TLS_CA_FILES", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.servers, vec!["db-1:27017", "db-2:27017"]);
                assert_eq!(config.db, "netlify");
                assert_eq!(config.conn_timeout, 4);
                assert!(config.tls.is_none());
            },
        );
    }

    #[test]
    fn test_from_env_with_tls() {
        temp_env::with_vars(
            [
                ("MONGO_SERVERS", Some("db-1")),
                ("MONGO_DB", Some("netlify")),
                ("MONGO_CONN_TIMEOUT", None),
                ("MONGO_TLS_CERT_FILE", Some("/certs/client.pem")),
                ("MONGO_TLS_KEY_FILE", Some("/certs/client.key")),
                ("MONGO_TLS_CA_FILES", Some("/certs/ca1.pem,/certs/ca2.pem")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.conn_timeout, DEFAULT_CONN_TIMEOUT_SECS);
                let tls = config.tls.unwrap();
                assert_eq!(tls.cert_file, "/certs/client.pem");
                assert_eq!(tls.ca_files, vec!["/certs/ca1.pem", "/certs/ca2.pem"]);
            },
        );
    }

    #[test]
    fn test_from_env_missing_servers() {
        temp_env::with_vars(
            [("MONGO_SERVERS", None), ("MONGO_DB", Some("netlify"))],
            || {
                assert_eq!(
                    Config::from_env(),
                    Err(ConfigError::MissingEnvVar("MONGO_SERVERS".into()))
                );
            },
        );
    }

    #[test]
    fn test_from_env_bad_timeout() {
        temp_env::with_vars(
            [
                ("MONGO_SERVERS", Some("db-1")),
                ("MONGO_DB", Some("netlify")),
                ("MONGO_CONN_TIMEOUT", Some("soon")),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "MONGO_CONN_TIMEOUT"));
            },
        );
    }
}
