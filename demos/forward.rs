//! Forwards a port for TCP and UDP, lists the router's mappings, then clears the port.
//!
//! Usage: cargo run --example forward -- 9980

use std::env;

use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

fn main() {
    let port: u16 = match env::args().nth(1).map(|p| p.parse()) {
        Some(Ok(port)) => port,
        _ => {
            println!("A port number is required");
            println!("Example: cargo run --example forward -- 9980");
            return;
        }
    };

    let _ = SimpleLogger::init(LevelFilter::Debug, LogConfig::default());

    let gateway = match igd_forward::discover() {
        Ok(gateway) => gateway,
        Err(err) => return println!("Failed to find a gateway: {}", err),
    };
    match gateway.internal_ip() {
        Ok(ip) => println!("Forwarding to local address {}", ip),
        Err(err) => return println!("{}", err),
    }

    if let Err(err) = gateway.forward(port, "igd-forward example") {
        return println!("Failed to forward port {}: {}", port, err);
    }
    println!("Port {} forwarded for TCP and UDP", port);

    match gateway.port_mappings() {
        Ok(mappings) => {
            for m in mappings {
                println!(
                    "{} {} -> {}:{} ({})",
                    m.protocol, m.external_port, m.internal_client, m.internal_port, m.port_mapping_description
                );
            }
        }
        Err(err) => println!("Failed to list mappings: {}", err),
    }

    match gateway.clear(port) {
        Ok(()) => println!("Port {} cleared", port),
        Err(err) => println!("Failed to clear port {}: {}", port, err),
    }
}
