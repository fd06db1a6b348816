use std::fmt;

use url::Url;

use crate::common::{messages, parsing};
use crate::errors::{RequestError, SearchError};
use crate::soap;
use crate::PortMappingEntry;
use crate::PortMappingProtocol;

/// The connection services a gateway may expose port mapping control on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    /// `WANIPConnection:1`, used by routers that hold the WAN address themselves.
    WanIpConnection,
    /// `WANPPPConnection:1`, used by PPP (typically DSL) routers.
    WanPppConnection,
}

impl ServiceType {
    /// The service URN, used as search target and action namespace.
    pub fn urn(self) -> &'static str {
        match self {
            ServiceType::WanIpConnection => "urn:schemas-upnp-org:service:WANIPConnection:1",
            ServiceType::WanPppConnection => "urn:schemas-upnp-org:service:WANPPPConnection:1",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.urn())
    }
}

/// The actions a gateway handle needs from a connection service.
///
/// `ServiceClient` implements this over SOAP. Its namespace is fixed when it is
/// built, so callers never inspect the service type per call.
pub trait ConnectionService: fmt::Debug + Send + Sync {
    /// Invoke `GetExternalIPAddress`.
    fn get_external_ip_address(&self) -> Result<String, RequestError>;

    /// Invoke `AddPortMapping` with the fields of `mapping`.
    fn add_port_mapping(&self, mapping: &PortMappingEntry) -> Result<(), RequestError>;

    /// Invoke `DeletePortMapping`.
    fn delete_port_mapping(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: PortMappingProtocol,
    ) -> Result<(), RequestError>;

    /// Invoke `GetGenericPortMappingEntry`.
    fn get_generic_port_mapping_entry(&self, index: u32) -> Result<PortMappingEntry, RequestError>;

    /// URL of the device description this service was read from.
    fn location(&self) -> &Url;

    /// The base URL the device advertises for itself.
    fn base_url(&self) -> &Url;

    /// URL actions are posted to.
    fn control_url(&self) -> &Url;

    /// The action namespace of this service.
    fn service_type(&self) -> ServiceType;
}

/// A connection service of one device, reached over SOAP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceClient {
    location: Url,
    base_url: Url,
    control_url: Url,
    service_type: ServiceType,
}

impl ServiceClient {
    /// Build a client from its parts, without contacting the device.
    pub fn new(location: Url, base_url: Url, control_url: Url, service_type: ServiceType) -> ServiceClient {
        ServiceClient {
            location,
            base_url,
            control_url,
            service_type,
        }
    }

    /// Fetch the device description at `location` and build a client for every
    /// service of `service_type` it lists.
    pub fn from_location(location: &Url, service_type: ServiceType) -> Result<Vec<ServiceClient>, SearchError> {
        let text = fetch_description(location)?;
        Self::from_description(&text, location, service_type)
    }

    pub(crate) fn from_description(
        text: &str,
        location: &Url,
        service_type: ServiceType,
    ) -> Result<Vec<ServiceClient>, SearchError> {
        let description = parsing::parse_description(text.as_bytes(), location)?;
        let clients = description
            .control_urls(service_type.urn())?
            .into_iter()
            .map(|control_url| {
                ServiceClient::new(
                    location.clone(),
                    description.base_url.clone(),
                    control_url,
                    service_type,
                )
            })
            .collect::<Vec<_>>();
        debug!(
            "found {} {} service(s) in description at {}",
            clients.len(),
            service_type,
            location
        );
        Ok(clients)
    }

    fn perform_request(&self, action: &str, body: &str) -> parsing::RequestResult {
        let header = messages::format_action_header(self.service_type.urn(), action);
        debug!("sending {} to {}", action, self.control_url);
        let text = soap::send(self.control_url.as_str(), soap::Action::new(&header), body)?;
        parsing::parse_response(text, &messages::response_name(action))
    }
}

impl ConnectionService for ServiceClient {
    fn get_external_ip_address(&self) -> Result<String, RequestError> {
        let result = self.perform_request(
            messages::GET_EXTERNAL_IP_ACTION,
            &messages::format_get_external_ip_message(self.service_type.urn()),
        );
        parsing::parse_get_external_ip_response(result)
    }

    fn add_port_mapping(&self, mapping: &PortMappingEntry) -> Result<(), RequestError> {
        self.perform_request(
            messages::ADD_PORT_MAPPING_ACTION,
            &messages::format_add_port_mapping_message(self.service_type.urn(), mapping),
        )?;
        Ok(())
    }

    fn delete_port_mapping(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: PortMappingProtocol,
    ) -> Result<(), RequestError> {
        self.perform_request(
            messages::DELETE_PORT_MAPPING_ACTION,
            &messages::format_delete_port_message(self.service_type.urn(), remote_host, external_port, protocol),
        )?;
        Ok(())
    }

    fn get_generic_port_mapping_entry(&self, index: u32) -> Result<PortMappingEntry, RequestError> {
        let result = self.perform_request(
            messages::GET_GENERIC_PORT_MAPPING_ENTRY_ACTION,
            &messages::format_get_generic_port_mapping_entry_message(self.service_type.urn(), index),
        );
        parsing::parse_get_generic_port_mapping_entry(result)
    }

    fn location(&self) -> &Url {
        &self.location
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn control_url(&self) -> &Url {
        &self.control_url
    }

    fn service_type(&self) -> ServiceType {
        self.service_type
    }
}

pub(crate) fn fetch_description(location: &Url) -> Result<String, SearchError> {
    debug!("requesting device description from: {}", location);
    Ok(attohttpc::get(location.as_str()).send()?.text()?)
}
