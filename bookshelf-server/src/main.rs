//! Bookshelf server: HTTP catalog API with a live WebSocket change feed.
//!
//! Configuration comes from `ServerConfig::from_env` and can be overridden
//! on the command line:
//!
//! ```text
//! bookshelf-server [--listen 127.0.0.1:8000] [--data-file books.json]
//! ```
//!
//! Log verbosity follows `RUST_LOG` (e.g. `RUST_LOG=bookshelf_sync=debug`).

use std::path::PathBuf;

use bookshelf_sync::{BookServer, ServerConfig};
use log::info;

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().cloned();
        }
    }
    None
}

fn load_config(args: &[String]) -> ServerConfig {
    let mut config = ServerConfig::from_env();
    if let Some(listen) = parse_arg(args, "--listen") {
        config.bind_addr = listen;
    }
    if let Some(path) = parse_arg(args, "--data-file") {
        config.data_file = PathBuf::from(path);
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(&args);
    info!("Starting bookshelf server on {}...", config.bind_addr);

    let server = BookServer::new(config).await?;
    server.run().await?;
    Ok(())
}
