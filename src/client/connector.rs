//! The connect entry point

use super::config::Config;
use crate::session::{tls_dial_server, Database, Session};
use crate::Result;
use tracing::{Instrument, Span};

/// Dial the cluster described by `config` and select its database.
///
/// Log lines are emitted in a `connect` span whose parent is `log`, so
/// fields the caller attached (request id, service name) carry over.
///
/// When `config.tls` is set, the TLS material is loaded before any socket is
/// opened and every server is dialed through a TLS handshake; a load failure
/// returns immediately. Otherwise servers are dialed over plain TCP.
///
/// The dial is a single attempt bounded by `config.conn_timeout`. Errors from
/// the TLS loader or the driver are returned unchanged. The returned handle
/// owns the connection; there is nothing to close explicitly.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> mongo_connect::Result<()> {
/// use mongo_connect::connection::TlsSettings;
/// use mongo_connect::{connect, Config};
///
/// let config = Config::new(vec!["db-1.internal:27017".into()], "netlify")
///     .with_conn_timeout(5)
///     .with_tls(
///         TlsSettings::new("/etc/mongo/client.pem", "/etc/mongo/client.key")
///             .with_ca_file("/etc/mongo/ca.pem"),
///     );
///
/// let db = connect(&config, &tracing::info_span!("startup")).await?;
/// assert!(db.session().is_encrypted());
/// # Ok(())
/// # }
/// ```
pub async fn connect(config: &Config, log: &Span) -> Result<Database> {
    let tls = config.tls.is_some();
    crate::metrics::counters::connect_attempt(tls);

    let result = dial(config)
        .instrument(tracing::debug_span!(parent: log, "connect", db = %config.db))
        .await;

    match &result {
        Ok(_) => crate::metrics::counters::connect_success(tls),
        Err(e) => crate::metrics::counters::connect_failure(e.category()),
    }
    result
}

async fn dial(config: &Config) -> Result<Database> {
    let mut info = config.dial_info();

    match &config.tls {
        Some(tls) => {
            tracing::debug!(
                cert_file = %tls.cert_file,
                key_file = %tls.key_file,
                ca_files = %tls.ca_files.join(","),
                "Using TLS config"
            );
            let client_config = tls.client_config()?;
            info.dial_server = Some(tls_dial_server(client_config));
        }
        None => tracing::debug!("Skipping TLS config"),
    }

    tracing::debug!(servers = %info.addrs.join(","), "Dialing database");
    let session = Session::dial_with_info(&info).await?;

    tracing::debug!(db = %config.db, "Got session, using database {}", config.db);
    Ok(session.db(config.db.as_str()))
}
