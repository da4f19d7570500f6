//! Connect using settings from the environment and report what answered.
//!
//! ```bash
//! export MONGO_SERVERS="localhost:27017"
//! export MONGO_DB="netlify"
//! # optional mutual TLS
//! export MONGO_TLS_CERT_FILE=/etc/mongo/client.pem
//! export MONGO_TLS_KEY_FILE=/etc/mongo/client.key
//! export MONGO_TLS_CA_FILES=/etc/mongo/ca.pem
//!
//! RUST_LOG=mongo_connect=debug cargo run --example connect
//! ```

use mongo_connect::{connect, Collection, Config};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let span = tracing::info_span!("demo", app = "connect");
    let db = connect(&config, &span).await?;

    let session = db.session();
    let info = session.server_info();
    println!("connected to {} (encrypted: {})", session.server(), session.is_encrypted());
    println!(
        "  wire versions {}..={}, writable primary: {}",
        info.min_wire_version, info.max_wire_version, info.is_writable_primary
    );
    if let Some(set) = &info.set_name {
        println!("  replica set: {}", set);
    }

    println!("database: {}", db.name());
    for collection in Collection::ALL {
        println!("  {}", collection);
    }

    session.ping().await?;
    println!("ping ok");
    Ok(())
}
