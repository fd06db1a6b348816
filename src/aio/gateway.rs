use std::fmt;

use url::Url;

use super::soap;
use crate::common::{messages, parsing};
use crate::errors::{GatewayError, RequestError};
use crate::gateway::{device_host, symmetric_mapping, MappingWalk};
use crate::resolver;
use crate::service::{ConnectionService, ServiceClient, ServiceType};
use crate::soap::Action;
use crate::{PortMappingEntry, PortMappingProtocol};

/// A handle on the connection service of one gateway, for use with tokio.
///
/// Behaves like the blocking `Gateway`: the same mappings are made in the same order.
#[derive(Clone, Debug)]
pub struct Gateway {
    service: ServiceClient,
}

impl Gateway {
    pub(crate) fn new(service: ServiceClient) -> Gateway {
        Gateway { service }
    }

    async fn perform_request(&self, action: &str, body: &str) -> parsing::RequestResult {
        let header = messages::format_action_header(self.service.service_type().urn(), action);
        debug!("sending {} to {}", action, self.service.control_url());
        let text = soap::send_async(self.service.control_url().as_str(), Action::new(&header), body).await?;
        parsing::parse_response(text, &messages::response_name(action))
    }

    /// Get the external IP address of the gateway, exactly as the gateway reports it.
    pub async fn get_external_ip(&self) -> Result<String, GatewayError> {
        let result = self
            .perform_request(
                messages::GET_EXTERNAL_IP_ACTION,
                &messages::format_get_external_ip_message(self.service.service_type().urn()),
            )
            .await;
        Ok(parsing::parse_get_external_ip_response(result)?)
    }

    /// Forward `port` on the gateway to the same port on this host, for TCP and then UDP.
    ///
    /// See `Gateway::forward` for the failure behavior.
    pub async fn forward(&self, port: u16, description: &str) -> Result<(), GatewayError> {
        if port == 0 {
            return Err(GatewayError::ExternalPortZeroInvalid);
        }
        let internal_ip = resolver::resolve_internal_address(device_host(self.service.base_url()))?;
        for &protocol in PortMappingProtocol::PAIR.iter() {
            let mapping = symmetric_mapping(port, protocol, internal_ip, description);
            let result = self
                .perform_request(
                    messages::ADD_PORT_MAPPING_ACTION,
                    &messages::format_add_port_mapping_message(self.service.service_type().urn(), &mapping),
                )
                .await;
            if let Err(e) = result {
                warn!("failed to forward {} port {} to {}: {}", protocol, port, internal_ip, e);
                return Err(e.into());
            }
        }
        debug!("forwarded port {} to {}", port, internal_ip);
        Ok(())
    }

    /// Remove the TCP and then the UDP mapping of `port`, stopping at the first failure.
    pub async fn clear(&self, port: u16) -> Result<(), GatewayError> {
        if port == 0 {
            return Err(GatewayError::ExternalPortZeroInvalid);
        }
        for &protocol in PortMappingProtocol::PAIR.iter() {
            let result = self
                .perform_request(
                    messages::DELETE_PORT_MAPPING_ACTION,
                    &messages::format_delete_port_message(self.service.service_type().urn(), "", port, protocol),
                )
                .await;
            if let Err(e) = result {
                warn!("failed to clear {} port {}: {}", protocol, port, e);
                return Err(e.into());
            }
        }
        debug!("cleared port {}", port);
        Ok(())
    }

    /// List the gateway's port mapping table, with the same bounds as `Gateway::port_mappings`.
    pub async fn port_mappings(&self) -> Result<Vec<PortMappingEntry>, GatewayError> {
        let mut walk = MappingWalk::default();
        for index in 0.. {
            if !walk.push(self.get_generic_port_mapping_entry(index).await)? {
                break;
            }
        }
        Ok(walk.into_entries())
    }

    async fn get_generic_port_mapping_entry(&self, index: u32) -> Result<PortMappingEntry, RequestError> {
        let result = self
            .perform_request(
                messages::GET_GENERIC_PORT_MAPPING_ENTRY_ACTION,
                &messages::format_get_generic_port_mapping_entry_message(self.service.service_type().urn(), index),
            )
            .await;
        parsing::parse_get_generic_port_mapping_entry(result)
    }

    /// The URL of the gateway's device description.
    pub fn location(&self) -> String {
        self.service.location().to_string()
    }

    /// The URL actions are sent to.
    pub fn control_url(&self) -> &Url {
        self.service.control_url()
    }

    /// The connection service this handle controls.
    pub fn service_type(&self) -> ServiceType {
        self.service.service_type()
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.service.control_url())
    }
}
