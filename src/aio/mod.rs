//! This module implements the same features as the main crate, but using async io.

mod gateway;
mod search;
mod soap;

use url::Url;

use crate::common::SearchOptions;
use crate::discover::{first_client, select_service, SERVICE_PRIORITY};
use crate::errors::DiscoverError;
use crate::service::ServiceClient;

pub use self::gateway::Gateway;
pub use self::search::search_services;

/// Search the local network for a gateway with the default `SearchOptions`.
pub async fn discover() -> Result<Gateway, DiscoverError> {
    discover_with(SearchOptions::default()).await
}

/// Search the local network for a gateway, trying each service type in priority order.
pub async fn discover_with(options: SearchOptions) -> Result<Gateway, DiscoverError> {
    for &service_type in SERVICE_PRIORITY.iter() {
        let clients = search_services(service_type, &options).await.unwrap_or_else(|e| {
            debug!("search for {} failed: {}", service_type, e);
            Vec::new()
        });
        if let Some(client) = first_client(service_type, clients) {
            return Ok(Gateway::new(client));
        }
    }
    Err(DiscoverError::NoGatewayFound)
}

/// Connect to the gateway whose description is at `location`, without searching.
pub async fn load(location: &str) -> Result<Gateway, DiscoverError> {
    let location = Url::parse(location)?;
    let text = search::get_description(&location).await.map_err(|e| {
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
