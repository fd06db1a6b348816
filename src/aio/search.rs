use std::str;

use bytes::Bytes;
use futures::future::join_all;
use hyper::{Client, Uri};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use url::Url;

use crate::common::{messages, parsing, SearchOptions};
use crate::errors::SearchError;
use crate::service::{ServiceClient, ServiceType};

const MAX_RESPONSE_SIZE: usize = 1500;

/// Search the local network for devices offering `service_type`.
///
/// Collects responses the same way as the blocking `search_services`, then
/// fetches the descriptions of all responding devices concurrently.
pub async fn search_services(
    service_type: ServiceType,
    options: &SearchOptions,
) -> Result<Vec<ServiceClient>, SearchError> {
    let locations = search_locations(service_type, options).await?;

    let descriptions = join_all(locations.iter().map(|location| get_description(location))).await;

    let mut clients = Vec::new();
    for (location, description) in locations.iter().zip(descriptions) {
        let found = description.and_then(|text| ServiceClient::from_description(&text, location, service_type));
        match found {
            Ok(mut found) => clients.append(&mut found),
            Err(e) => debug!("skipping device at {}: {}", location, e),
        }
    }
    Ok(clients)
}

/// Fetch the device description at `location`.
pub(crate) async fn get_description(location: &Url) -> Result<String, SearchError> {
    let uri: Uri = location.as_str().parse()?;
    debug!("requesting device description from: {}", uri);

    let client = Client::new();
    let resp = client.get(uri).await?;
    let body: Bytes = hyper::body::to_bytes(resp.into_body()).await?;

    Ok(str::from_utf8(&body)?.to_string())
}

async fn search_locations(service_type: ServiceType, options: &SearchOptions) -> Result<Vec<Url>, SearchError> {
    let socket = UdpSocket::bind(options.bind_addr).await?;
    let request = messages::format_search_request(service_type.urn());

    debug!(
        "sending search for {} to: {} on interface: {:?}",
        service_type,
        options.broadcast_address,
        socket.local_addr()
    );
    socket.send_to(request.as_bytes(), options.broadcast_address).await?;

    let mut locations = Vec::new();
    match options.timeout {
        Some(window) => {
            // the window closing is the normal way out
            if let Ok(result) = timeout(window, receive_locations(&socket, service_type, &mut locations, false)).await
            {
                result?;
            }
        }
        None => receive_locations(&socket, service_type, &mut locations, true).await?,
    }
    Ok(locations)
}

async fn receive_locations(
    socket: &UdpSocket,
    service_type: ServiceType,
    locations: &mut Vec<Url>,
    first_only: bool,
) -> Result<(), SearchError> {
    let mut buf = [0u8; MAX_RESPONSE_SIZE];
    loop {
        let (read, from) = socket.recv_from(&mut buf).await?;

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

        if first_only {
            return Ok(());
        }
    }
}
