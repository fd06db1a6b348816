use std::io;
use std::net::UdpSocket;
use std::str;
use std::time::Instant;

use url::Url;

use crate::common::{messages, parsing, SearchOptions};
use crate::errors::SearchError;
use crate::service::{ServiceClient, ServiceType};

const MAX_RESPONSE_SIZE: usize = 1500;

/// Search the local network for devices offering `service_type`.
///
/// One search request is sent; responses are collected for `options.timeout`, or
/// until the first valid one when there is no timeout. Every device that answered
/// has its description fetched, and a client is returned for each matching service,
/// in the order the devices answered. Devices whose description can not be read
/// are skipped.
///
/// Each call uses its own socket, so searches may run concurrently.
pub fn search_services(service_type: ServiceType, options: &SearchOptions) -> Result<Vec<ServiceClient>, SearchError> {
    let locations = search_locations(service_type, options)?;

    let mut clients = Vec::new();
    for location in locations {
        match ServiceClient::from_location(&location, service_type) {
            Ok(mut found) => clients.append(&mut found),
            Err(e) => debug!("skipping device at {}: {}", location, e),
        }
    }
    Ok(clients)
}

// Send the search request and gather the distinct description locations.
fn search_locations(service_type: ServiceType, options: &SearchOptions) -> Result<Vec<Url>, SearchError> {
    let socket = UdpSocket::bind(options.bind_addr)?;
    let request = messages::format_search_request(service_type.urn());

    debug!(
        "sending search for {} to: {} on interface: {:?}",
        service_type,
        options.broadcast_address,
        socket.local_addr()
    );
    socket.send_to(request.as_bytes(), options.broadcast_address)?;

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut locations: Vec<Url> = Vec::new();
    let mut buf = [0u8; MAX_RESPONSE_SIZE];

    loop {
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            socket.set_read_timeout(Some(deadline - now))?;
        }

        let (read, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        };

        let location = str::from_utf8(&buf[..read])
            .map_err(SearchError::from)
            .and_then(|text| parsing::parse_search_result(text, service_type.urn()));
        match location {
            Ok(location) => {
                if locations.contains(&location) {
                    debug!("received duplicate search response from: {}, dropping", from);
                } else {
                    debug!("received search response from: {} (location: {})", from, location);
                    locations.push(location);
                }
            }
            Err(e) => {
                debug!("ignoring search response from: {}: {}", from, e);
                continue;
            }
        }

        if deadline.is_none() {
            break;
        }
    }

    Ok(locations)
}
