//! corpkv Client Binary
//!
//! Sends one request read from a JSON file and prints the response.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use corpkv::client::{default_client_id, Client, DEFAULT_TIMEOUT};
use corpkv::protocol::CLIENT_ID_FIELD;
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// corpkv Client
#[derive(Parser, Debug)]
#[command(name = "corpkv-client")]
#[command(about = "Send a get/set/list/list_logs request to a corpkv server")]
#[command(version)]
struct Args {
    /// JSON file holding the request
    #[arg(short, long)]
    input: PathBuf,

    /// Write the response to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Server host
    #[arg(short, long, default_value = "localhost")]
    server: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Reading request from {}", args.input.display());
    let text = match fs::read_to_string(&args.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: cannot read input file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let mut request: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: '{}' is not valid JSON: {}", args.input.display(), e);
            process::exit(1);
        }
    };

    if let Value::Object(map) = &mut request {
        if !map.contains_key(CLIENT_ID_FIELD) {
            let client_id = default_client_id();
            tracing::debug!("No UUID in request, using {}", client_id);
            map.insert(CLIENT_ID_FIELD.to_string(), Value::String(client_id));
        }
    }

    let addr = format!("{}:{}", args.server, args.port);
    tracing::debug!("Connecting to {}...", addr);

    let client = Client::new(addr.clone()).with_timeout(DEFAULT_TIMEOUT);
    let response = match client.send(&request) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Error: request to {} failed: {}", addr, e);
            process::exit(1);
        }
    };
    tracing::debug!("Received {} bytes", response.len());

    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &response) {
                eprintln!("Error: cannot write output file '{}': {}", path.display(), e);
                process::exit(1);
            }
            println!("Response saved to {}", path.display());
        }
        None => match serde_json::from_str::<Value>(&response) {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", response),
            },
            Err(_) => println!("{}", response),
        },
    }
}
