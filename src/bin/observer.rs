//! corpkv Observer Binary
//!
//! Subscribes to a corpkv server and prints every notification, reconnecting
//! whenever the connection is lost.

use std::thread;
use std::time::Duration;

use clap::Parser;
use corpkv::client::{default_client_id, DEFAULT_TIMEOUT};
use corpkv::Subscription;
use tracing_subscriber::{fmt, EnvFilter};

/// corpkv Observer
#[derive(Parser, Debug)]
#[command(name = "corpkv-observer")]
#[command(about = "Print change notifications pushed by a corpkv server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(short, long, default_value = "localhost")]
    server: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Seconds to wait before reconnecting
    #[arg(short, long, default_value = "30")]
    retry: u64,

    /// Log connection attempts
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let addr = format!("{}:{}", args.server, args.port);
    let client_id = default_client_id();
    let retry = Duration::from_secs(args.retry);

    tracing::info!("Observer started. UUID: {}", client_id);
    tracing::info!("Server {}, retrying every {}s", addr, args.retry);

    loop {
        tracing::debug!("Connecting to {}...", addr);
        match listen(&addr, &client_id) {
            Ok(()) => tracing::info!("Server closed the connection"),
            Err(e) => tracing::warn!("Connection lost: {}", e),
        }

        tracing::info!("Reconnecting in {} seconds...", args.retry);
        thread::sleep(retry);
    }
}

/// Subscribe and print notifications until the connection ends
fn listen(addr: &str, client_id: &str) -> corpkv::Result<()> {
    let mut subscription = Subscription::open(addr, client_id, DEFAULT_TIMEOUT)?;
    tracing::info!("Subscribed, waiting for notifications...");

    while let Some(notification) = subscription.next_notification()? {
        println!("{}", serde_json::to_string_pretty(&notification)?);
    }
    Ok(())
}
