//! In-process stand-ins for mongod used by the integration tests.
//!
//! The mock speaks just enough `OP_MSG` to complete the handshake and answer
//! simple commands. The TLS flavour requires a client certificate signed by
//! `tests/fixtures/ca.pem`, the same way a server started with
//! `--tlsMode requireTLS --tlsCAFile` would.

#![allow(dead_code)]

use bson::{doc, Document};
use bytes::{Buf, BytesMut};
use mongo_connect::protocol::{decode_message, encode_message, OpMsg};
use rustls::server::WebPkiClientVerifier;
use rustls::{ProtocolVersion, RootCertStore, ServerConfig};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Absolute path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Reply a healthy standalone primary sends to `isMaster`
pub fn primary_reply() -> Document {
    doc! {
        "ismaster": true,
        "maxWireVersion": 17,
        "minWireVersion": 0,
        "ok": 1.0,
    }
}

/// What the TLS mock learned about a client during the handshake
#[derive(Debug, Clone)]
pub struct TlsObservation {
    /// Number of certificates the client presented
    pub peer_certs: usize,
    /// Negotiated protocol version
    pub version: Option<ProtocolVersion>,
}

/// A running mock server
pub struct MockServer {
    /// `host:port` to dial
    pub addr: String,
    accepts: Arc<AtomicUsize>,
    handshakes: mpsc::UnboundedReceiver<TlsObservation>,
}

impl MockServer {
    /// Number of TCP connections accepted so far
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Next completed TLS handshake, if any arrived
    pub fn try_handshake(&mut self) -> Option<TlsObservation> {
        self.handshakes.try_recv().ok()
    }
}

/// Plain TCP server answering the handshake with `reply`
pub async fn spawn_plain(reply: Document) -> MockServer {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap().to_string();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (_tx, handshakes) = mpsc::unbounded_channel();

    let counter = accepts.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let reply = reply.clone();
            tokio::spawn(async move {
                let _ = serve(stream, reply).await;
            });
        }
    });

    MockServer {
        addr,
        accepts,
        handshakes,
    }
}

/// TLS server that requires a client certificate from the fixture CA
pub async fn spawn_tls(reply: Document) -> MockServer {
    let acceptor = TlsAcceptor::from(server_config());
    let listener = bind().await;
    let addr = listener.local_addr().unwrap().to_string();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (tx, handshakes) = mpsc::unbounded_channel();

    let counter = accepts.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            let tx = tx.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(stream).await else {
                    return;
                };
                let (_, conn) = tls.get_ref();
                let _ = tx.send(TlsObservation {
                    peer_certs: conn.peer_certificates().map_or(0, |c| c.len()),
                    version: conn.protocol_version(),
                });
                let _ = serve(tls, reply).await;
            });
        }
    });

    MockServer {
        addr,
        accepts,
        handshakes,
    }
}

/// Server that accepts connections and never answers
pub async fn spawn_silent() -> MockServer {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap().to_string();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (_tx, handshakes) = mpsc::unbounded_channel();

    let counter = accepts.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    MockServer {
        addr,
        accepts,
        handshakes,
    }
}

/// An address nothing listens on
pub async fn closed_addr() -> String {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

async fn serve<S>(mut stream: S, handshake_reply: Document) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    let mut next_id = 1000;

    loop {
        let msg = match decode_message(&buf) {
            Ok((msg, consumed)) => {
                buf.advance(consumed);
                msg
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                if stream.read_buf(&mut buf).await? == 0 {
                    return Ok(());
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        let body = if msg.body.contains_key("isMaster") || msg.body.contains_key("hello") {
            handshake_reply.clone()
        } else {
            doc! {
                "ok": 1.0,
                "db": msg.body.get_str("$db").unwrap_or_default(),
            }
        };

        next_id += 1;
        let out = encode_message(&OpMsg::reply(next_id, msg.request_id, body))?;
        stream.write_all(&out).await?;
        stream.flush().await?;
    }
}

fn server_config() -> Arc<ServerConfig> {
    let certs = load_certs(&fixture("server.pem"));
    let key = load_key(&fixture("server.key"));

    let mut roots = RootCertStore::empty();
    for cert in load_certs(&fixture("ca.pem")) {
        roots.add(cert).unwrap();
    }
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .unwrap();

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .unwrap();
    Arc::new(config)
}

fn load_certs(path: &str) -> Vec<CertificateDer<'static>> {
    let mut reader = BufReader::new(std::fs::File::open(path).unwrap());
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn load_key(path: &str) -> PrivateKeyDer<'static> {
    let mut reader = BufReader::new(std::fs::File::open(path).unwrap());
    rustls_pemfile::private_key(&mut reader).unwrap().unwrap()
}

/// One event recorded by [`CapturedLogs`]
#[derive(Debug, Clone, Default)]
pub struct LogLine {
    /// Formatted message
    pub message: String,
    /// Remaining fields, formatted
    pub fields: HashMap<String, String>,
}

impl Visit for LogLine {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }
}

/// Layer collecting every event emitted on the current thread
#[derive(Clone, Default)]
pub struct CapturedLogs {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl CapturedLogs {
    /// First recorded event whose message equals `message`
    pub fn find(&self, message: &str) -> Option<LogLine> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .find(|line| line.message == message)
            .cloned()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LogLine::default();
        event.record(&mut line);
        self.lines.lock().unwrap().push(line);
    }
}

/// Route events to a fresh [`CapturedLogs`] until the guard drops.
///
/// Only sees events from the current thread, so use it with the default
/// current-thread `#[tokio::test]` runtime.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    (logs, tracing::subscriber::set_default(subscriber))
}
