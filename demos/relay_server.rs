//! Camera relay server example
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example relay_server                    # binds to 0.0.0.0:$PORT (default 3000)
//!   cargo run --example relay_server localhost          # binds to 127.0.0.1:3000
//!   cargo run --example relay_server 127.0.0.1:3001     # binds to 127.0.0.1:3001
//!
//! ## Devices (capture pages)
//!
//! Connect to ws://HOST/ws and send:
//!   {"event":"register-device","data":{"name":"Phone-A","userAgent":"..."}}
//!   {"event":"video-frame","data":{"frame":"data:image/jpeg;base64,..."}}
//!
//! ## Observers (admin dashboard)
//!
//!   {"event":"get-devices"}
//!   {"event":"request-view","data":"<device id>"}
//!   {"event":"get-stream","data":"<device id>"}
//!
//! ## Health
//!
//!   curl http://localhost:3000/health

use std::net::SocketAddr;
use std::time::Duration;

use camhub::{RelayServer, ServerConfig};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:3000
/// - "localhost:3001" -> 127.0.0.1:3001
/// - "127.0.0.1" -> 127.0.0.1:3000
/// - "0.0.0.0:3000" -> 0.0.0.0:3000
fn parse_bind_addr(arg: &str, default_port: u16) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:$PORT, PORT defaults to 3000)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::from_env();

    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str, config.bind_addr.port()) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camhub=info".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let server = RelayServer::new(config);
    let hub = std::sync::Arc::clone(server.hub());

    // Periodic stats, like a dashboard would poll /health
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;
            let stats = hub.stats();
            let status = hub.status().await;
            tracing::debug!(
                devices = status.connected_devices,
                connections = stats.active_connections,
                frames = stats.frames_received,
                dropped = stats.messages_dropped,
                "Relay stats"
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
