use clap::Parser;
use ldp_engine::{DocumentStore, LdpOptions, LdpServer, LdpService, MemoryStore, RocksStore, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Linked Data Platform server
#[derive(Parser, Debug)]
#[command(name = "ldp-engine", version, about)]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// RocksDB data directory
    #[arg(long, conflicts_with = "in_memory")]
    data_path: Option<PathBuf>,

    /// Keep everything in memory, ignoring any configured data path
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(port) = args.port {
        config.listen_port = port;
    }
    if let Some(path) = args.data_path {
        config.data_path = Some(path);
    }
    if args.in_memory {
        config.data_path = None;
    }

    info!("LDP Engine v{}", ldp_engine::version());

    let store: Arc<dyn DocumentStore> = match &config.data_path {
        Some(path) => Arc::new(RocksStore::open(path)?),
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let options = LdpOptions {
        constraints_uri: Some(config.constraints_uri()?),
        ..Default::default()
    };
    let service = LdpService::new(store, options);
    service.ensure_root_container(&config.ldp_base()?).await?;

    LdpServer::new(config, service)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
