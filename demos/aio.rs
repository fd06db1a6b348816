//! Async API example.
//!
//! It demonstrates how to:
//! * get external IP
//! * forward a port
//! * clear it again
//!
//! Usage: cargo run --features aio --example aio -- 9980

use std::env;

use igd_forward::aio::discover;
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

#[tokio::main]
async fn main() {
    let port: u16 = match env::args().nth(1).map(|p| p.parse()) {
        Some(Ok(port)) => port,
        _ => {
            println!("A port number is required");
            println!("Example: cargo run --features aio --example aio -- 9980");
            return;
        }
    };

    let _ = SimpleLogger::init(LevelFilter::Debug, LogConfig::default());

    let gateway = match discover().await {
        Ok(gateway) => gateway,
        Err(err) => return println!("Failed to find a gateway: {}", err),
    };
    match gateway.get_external_ip().await {
        Ok(ip) => println!("Our public IP: {}", ip),
        Err(err) => return println!("Failed to get external IP: {}", err),
    }

    match gateway.forward(port, "igd-forward aio example").await {
        Ok(()) => println!("Port {} forwarded for TCP and UDP", port),
        Err(err) => return println!("Failed to forward port {}: {}", port, err),
    }
    match gateway.clear(port).await {
        Ok(()) => println!("Port {} cleared", port),
        Err(err) => println!("Failed to clear port {}: {}", port, err),
    }
}
