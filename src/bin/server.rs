//! corpkv Server Binary
//!
//! Starts the TCP server for corpkv.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use corpkv::{
    AuditedStorageGateway, Config, CorpError, Server, StorageBackend, StorageConnectionCache,
    SubscriptionBroadcaster,
};
use tracing_subscriber::{fmt, EnvFilter};

/// corpkv Server
#[derive(Parser, Debug)]
#[command(name = "corpkv-server")]
#[command(about = "Audited key-value server with change notifications")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory holding the table files (in-memory tables when omitted)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Create missing table files instead of refusing to start
    #[arg(long)]
    create_tables: bool,

    /// fsync every table write
    #[arg(long)]
    sync_writes: bool,

    /// Maximum request size in bytes
    #[arg(long, default_value = "4096")]
    max_request_bytes: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,corpkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let storage = match &args.data_dir {
        Some(dir) => StorageBackend::File {
            dir: dir.clone(),
            create_missing: args.create_tables,
            sync_writes: args.sync_writes,
        },
        None => StorageBackend::Memory,
    };

    let config = Config::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .max_request_bytes(args.max_request_bytes)
        .storage(storage)
        .build();

    tracing::info!("corpkv Server v{}", corpkv::VERSION);
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Storage: {:?}", config.storage);

    // Storage must be reachable before accepting anyone
    let storage = Arc::new(StorageConnectionCache::from_config(&config));
    let gateway = match AuditedStorageGateway::new(Arc::clone(&storage)) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::error!("FATAL: cannot connect to storage: {}", e);
            if matches!(e, CorpError::TableNotFound(_)) {
                tracing::error!(
                    "Create the '{}' and '{}' tables first, or pass --create-tables",
                    config.data_table,
                    config.log_table
                );
            }
            std::process::exit(1);
        }
    };

    let broadcaster = Arc::new(SubscriptionBroadcaster::with_queue_capacity(
        config.subscriber_queue_capacity,
    ));

    let server = match Server::bind(&config, gateway, broadcaster) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Cannot install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
