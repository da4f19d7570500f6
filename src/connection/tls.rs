//! TLS material loading for secure connections to MongoDB.
//!
//! Turns the certificate, key and CA file paths from configuration into a
//! rustls [`ClientConfig`]. Loading happens once per connect, before any
//! socket is opened, so bad material fails fast without touching the network.

use crate::{Error, Result};
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls_pemfile::Item;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

/// Paths to the TLS material used to reach the cluster.
///
/// `cert_file` and `key_file` together form the client identity presented
/// to servers that require mutual TLS; leave both empty to connect without a
/// client certificate. `ca_files` lists the PEM bundles trusted to sign the
/// server certificate; when empty the platform's native roots are used.
///
/// # Examples
///
/// ```no_run
/// use mongo_connect::connection::TlsSettings;
///
/// let tls = TlsSettings::new("/etc/mongo/client.pem", "/etc/mongo/client.key")
///     .with_ca_file("/etc/mongo/ca.pem");
/// let client_config = tls.client_config()?;
/// # Ok::<(), mongo_connect::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    /// PEM file holding the client certificate chain
    #[serde(default)]
    pub cert_file: String,
    /// PEM file holding the client private key
    #[serde(default)]
    pub key_file: String,
    /// PEM files holding trusted CA certificates
    #[serde(default)]
    pub ca_files: Vec<String>,
}

impl TlsSettings {
    /// Settings with a client identity and no custom CA
    pub fn new(cert_file: impl Into<String>, key_file: impl Into<String>) -> Self {
        Self {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            ca_files: Vec::new(),
        }
    }

    /// Trust an additional CA bundle
    pub fn with_ca_file(mut self, path: impl Into<String>) -> Self {
        self.ca_files.push(path.into());
        self
    }

    /// Whether a client certificate will be presented
    pub fn has_client_identity(&self) -> bool {
        !self.cert_file.is_empty() && !self.key_file.is_empty()
    }

    /// Load the material into a rustls client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if:
    /// - any referenced file cannot be read
    /// - a CA file contains no certificates
    /// - the certificate file holds no certificate or the key file no private key
    /// - only one of `cert_file` / `key_file` is set
    /// - rustls rejects the certificate/key pair
    pub fn client_config(&self) -> Result<Arc<ClientConfig>> {
        let roots = if self.ca_files.is_empty() {
            load_native_roots()?
        } else {
            let mut store = RootCertStore::empty();
            for path in &self.ca_files {
                load_ca_file(&mut store, path)?;
            }
            store
        };

        let builder = ClientConfig::builder().with_root_certificates(roots);

        let config = match (self.cert_file.is_empty(), self.key_file.is_empty()) {
            (true, true) => builder.with_no_client_auth(),
            (false, false) => {
                let chain = load_cert_chain(&self.cert_file)?;
                let key = load_private_key(&self.key_file)?;
                builder.with_client_auth_cert(chain, key).map_err(|e| {
                    Error::Tls(format!(
                        "invalid client certificate '{}' / key '{}': {}",
                        self.cert_file, self.key_file, e
                    ))
                })?
            }
            (false, true) => {
                return Err(Error::Tls(format!(
                    "cert_file '{}' is set but key_file is empty",
                    self.cert_file
                )))
            }
            (true, false) => {
                return Err(Error::Tls(format!(
                    "key_file '{}' is set but cert_file is empty",
                    self.key_file
                )))
            }
        };

        crate::metrics::counters::tls_material_loaded();
        Ok(Arc::new(config))
    }
}

fn read_pem(kind: &str, path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Tls(format!("failed to read {} '{}': {}", kind, path, e)))
}

fn load_native_roots() -> Result<RootCertStore> {
    let result = rustls_native_certs::load_native_certs();

    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if added == 0 {
        return Err(Error::Tls(format!(
            "no CA files configured and no system root certificates available ({} load errors)",
            result.errors.len()
        )));
    }
    if !result.errors.is_empty() {
        tracing::debug!(errors = result.errors.len(), "some system root certificates failed to load");
    }

    Ok(store)
}

/// Add every certificate in a PEM file to `store`.
fn load_ca_file(store: &mut RootCertStore, path: &str) -> Result<()> {
    let data = read_pem("CA file", path)?;
    let mut reader = std::io::Cursor::new(&data);
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                store.add(cert).map_err(|e| {
                    Error::Tls(format!("invalid CA certificate in '{}': {}", path, e))
                })?;
                found_certs += 1;
            }
            // Bundles sometimes carry keys or CRLs alongside the certificates
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                return Err(Error::Tls(format!(
                    "failed to parse CA certificate from '{}'",
                    path
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(Error::Tls(format!(
            "no valid certificates found in '{}'",
            path
        )));
    }

    Ok(())
}

fn load_cert_chain(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let data = read_pem("certificate file", path)?;
    let chain = rustls_pemfile::certs(&mut data.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to parse certificate '{}': {}", path, e)))?;

    if chain.is_empty() {
        return Err(Error::Tls(format!("no certificate found in '{}'", path)));
    }

    Ok(chain)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let data = read_pem("key file", path)?;
    rustls_pemfile::private_key(&mut data.as_slice())
        .map_err(|e| Error::Tls(format!("failed to parse private key '{}': {}", path, e)))?
        .ok_or_else(|| Error::Tls(format!("no private key found in '{}'", path)))
}
