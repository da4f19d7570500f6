//! Dial parameters and the custom dial hook

use super::addr::ServerAddr;
use crate::connection::Transport;
use crate::Result;
use futures::future::BoxFuture;
use rustls::ClientConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opens the transport to one server.
///
/// When set on [`DialInfo`] it replaces the default plain TCP dial, which is
/// how TLS is layered under the session without the session knowing about
/// certificates.
pub type DialServer = Arc<dyn Fn(ServerAddr) -> BoxFuture<'static, Result<Transport>> + Send + Sync>;

/// Parameters for [`Session::dial_with_info`](super::Session::dial_with_info)
#[derive(Clone)]
pub struct DialInfo {
    /// Seed addresses, dialed concurrently
    pub addrs: Vec<String>,
    /// Upper bound on the whole dial, handshake included
    pub timeout: Duration,
    /// Application name reported in the handshake metadata
    pub app_name: Option<String>,
    /// Custom dial function; `None` dials plain TCP
    pub dial_server: Option<DialServer>,
}

impl DialInfo {
    /// Dial info for plain TCP with the given addresses and timeout
    pub fn new(addrs: Vec<String>, timeout: Duration) -> Self {
        Self {
            addrs,
            timeout,
            app_name: None,
            dial_server: None,
        }
    }

    /// Open the transport to `addr` using the custom dial function if one is set
    pub(crate) async fn dial(&self, addr: ServerAddr) -> Result<Transport> {
        match &self.dial_server {
            Some(dial_server) => dial_server(addr).await,
            None => Transport::connect_tcp(&addr).await,
        }
    }
}

impl fmt::Debug for DialInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialInfo")
            .field("addrs", &self.addrs)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .field(
                "dial_server",
                &self.dial_server.as_ref().map(|_| "<DialServer>"),
            )
            .finish()
    }
}

/// Dial function that wraps every raw TCP connection in TLS.
///
/// The loaded client config is shared across dials; each call opens its own
/// socket and runs its own handshake.
pub fn tls_dial_server(client_config: Arc<ClientConfig>) -> DialServer {
    Arc::new(move |addr: ServerAddr| -> BoxFuture<'static, Result<Transport>> {
        let client_config = client_config.clone();
        Box::pin(async move { Transport::connect_tls(&addr, client_config).await })
    })
}
