use url::Url;

use crate::common::SearchOptions;
use crate::errors::DiscoverError;
use crate::gateway::Gateway;
use crate::search::search_services;
use crate::service::{fetch_description, ConnectionService, ServiceClient, ServiceType};

/// The order connection services are preferred in.
///
/// A router exposing both is driven through its PPP service, which is the one
/// that holds the WAN address on PPP links.
pub const SERVICE_PRIORITY: [ServiceType; 2] = [ServiceType::WanPppConnection, ServiceType::WanIpConnection];

/// Pick a service, trying each type of `priority` in turn.
///
/// `candidates` is asked for the clients of one type at a time, and only until a
/// type yields any. The first client of the first non-empty list wins.
pub fn select_service<F>(priority: &[ServiceType], mut candidates: F) -> Option<ServiceClient>
where
    F: FnMut(ServiceType) -> Vec<ServiceClient>,
{
    for &service_type in priority {
        if let Some(client) = first_client(service_type, candidates(service_type)) {
            return Some(client);
        }
    }
    None
}

/// The client a search or description for `service_type` yields, if any.
pub(crate) fn first_client(service_type: ServiceType, clients: Vec<ServiceClient>) -> Option<ServiceClient> {
    let client = clients.into_iter().next()?;
    debug!("selected {} service at {}", service_type, client.control_url());
    Some(client)
}

/// Search the local network for a gateway with the default `SearchOptions`.
pub fn discover() -> Result<Gateway, DiscoverError> {
    discover_with(SearchOptions::default())
}

/// Search the local network for a gateway.
///
/// Each service type is searched for in priority order, and the search stops at
/// the first type any device answers for. Search failures count as no answer.
pub fn discover_with(options: SearchOptions) -> Result<Gateway, DiscoverError> {
    let selected = select_service(&SERVICE_PRIORITY, |service_type| {
        match search_services(service_type, &options) {
            Ok(clients) => clients,
            Err(e) => {
                debug!("search for {} failed: {}", service_type, e);
                Vec::new()
            }
        }
    });
    selected.map(Gateway::new).ok_or(DiscoverError::NoGatewayFound)
}

/// Connect to the gateway whose description is at `location`, without searching.
///
/// `location` is what `Gateway::location` returned for an earlier handle. The
/// description is fetched once and the same service priority as `discover` applies.
pub fn load(location: &str) -> Result<Gateway, DiscoverError> {
    let location = Url::parse(location)?;
    let text = fetch_description(&location).map_err(|e| {
        debug!("failed to load description from {}: {}", location, e);
        DiscoverError::NoGatewayFound
    })?;

    let selected = select_service(&SERVICE_PRIORITY, |service_type| {
        ServiceClient::from_description(&text, &location, service_type).unwrap_or_else(|e| {
            debug!("no {} service in description at {}: {}", service_type, location, e);
            Vec::new()
        })
    });
    selected.map(Gateway::new).ok_or(DiscoverError::NoGatewayFound)
}
