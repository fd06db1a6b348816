use std::fmt;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use url::Url;

use crate::errors::{GatewayError, RequestError, ResolveError};
use crate::resolver;
use crate::service::{ConnectionService, ServiceType};
use crate::{PortMappingEntry, PortMappingProtocol};

// UPnP error codes that end a GetGenericPortMappingEntry walk.
const SPECIFIED_ARRAY_INDEX_INVALID: u16 = 713;
const NO_SUCH_ENTRY_IN_ARRAY: u16 = 714;

// One TCP and one UDP entry for every external port.
pub(crate) const MAX_MAPPING_ENTRIES: usize = 2 * 65536;

/// A handle on the connection service of one gateway.
///
/// Obtained from `discover` or `load`. The handle holds no background resources;
/// cloning it shares the same service, and it may be used from several threads.
#[derive(Clone, Debug)]
pub struct Gateway {
    service: Arc<dyn ConnectionService>,
}

impl Gateway {
    /// Wrap a connection service.
    pub fn new<S>(service: S) -> Gateway
    where
        S: ConnectionService + 'static,
    {
        Gateway {
            service: Arc::new(service),
        }
    }

    /// Get the external IP address of the gateway, exactly as the gateway reports it.
    pub fn get_external_ip(&self) -> Result<String, GatewayError> {
        Ok(self.service.get_external_ip_address()?)
    }

    /// Forward `port` on the gateway to the same port on this host, for TCP and then UDP.
    ///
    /// The mapping is permanent and enabled, and points at the local address on the
    /// gateway's subnet. If the TCP mapping fails, UDP is not attempted. If UDP fails,
    /// the TCP mapping stays on the gateway; calling `forward` again, or `clear` then
    /// `forward`, repairs it.
    pub fn forward(&self, port: u16, description: &str) -> Result<(), GatewayError> {
        self.forward_with(port, description, resolver::local_networks)
    }

    fn forward_with<F>(&self, port: u16, description: &str, networks: F) -> Result<(), GatewayError>
    where
        F: FnOnce() -> io::Result<Vec<IpNet>>,
    {
        if port == 0 {
            return Err(GatewayError::ExternalPortZeroInvalid);
        }
        let internal_ip = resolver::resolve_with(self.device_host(), networks)?;
        for &protocol in PortMappingProtocol::PAIR.iter() {
            let mapping = symmetric_mapping(port, protocol, internal_ip, description);
            if let Err(e) = self.service.add_port_mapping(&mapping) {
                warn!("failed to forward {} port {} to {}: {}", protocol, port, internal_ip, e);
                return Err(e.into());
            }
        }
        debug!("forwarded port {} to {}", port, internal_ip);
        Ok(())
    }

    /// Remove the TCP and then the UDP mapping of `port`.
    ///
    /// Stops at the first failure. Whether removing a missing mapping fails is up to
    /// the gateway.
    pub fn clear(&self, port: u16) -> Result<(), GatewayError> {
        if port == 0 {
            return Err(GatewayError::ExternalPortZeroInvalid);
        }
        for &protocol in PortMappingProtocol::PAIR.iter() {
            if let Err(e) = self.service.delete_port_mapping("", port, protocol) {
                warn!("failed to clear {} port {}: {}", protocol, port, e);
                return Err(e.into());
            }
        }
        debug!("cleared port {}", port);
        Ok(())
    }

    /// List the gateway's port mapping table.
    ///
    /// Stops early, with the entries read so far, if the gateway keeps answering
    /// the same entry or lists more entries than a mapping table can hold.
    pub fn port_mappings(&self) -> Result<Vec<PortMappingEntry>, GatewayError> {
        let mut walk = MappingWalk::default();
        for index in 0.. {
            if !walk.push(self.service.get_generic_port_mapping_entry(index))? {
                break;
            }
        }
        Ok(walk.into_entries())
    }

    /// The URL of the gateway's device description. Pass it to `load` to reconnect
    /// without searching.
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

    /// The local address the gateway reaches this host on. Recomputed on every call.
    pub fn internal_ip(&self) -> Result<IpAddr, ResolveError> {
        resolver::resolve_internal_address(self.device_host())
    }

    fn device_host(&self) -> &str {
        device_host(self.service.base_url())
    }
}

/// The host part of the base URL a device advertises.
pub(crate) fn device_host(base_url: &Url) -> &str {
    base_url.host_str().unwrap_or("")
}

/// A permanent, enabled mapping of `port` on the gateway to `port` on `internal_ip`.
pub(crate) fn symmetric_mapping(
    port: u16,
    protocol: PortMappingProtocol,
    internal_ip: IpAddr,
    description: &str,
) -> PortMappingEntry {
    PortMappingEntry {
        remote_host: String::new(),
        external_port: port,
        protocol,
        internal_port: port,
        internal_client: internal_ip.to_string(),
        enabled: true,
        port_mapping_description: description.to_string(),
        lease_duration: 0,
    }
}

fn ends_mapping_walk(err: &RequestError) -> bool {
    match err.error_code() {
        Some(SPECIFIED_ARRAY_INDEX_INVALID) | Some(NO_SUCH_ENTRY_IN_ARRAY) => true,
        _ => false,
    }
}

/// Collects the answers of a GetGenericPortMappingEntry walk.
#[derive(Debug, Default)]
pub(crate) struct MappingWalk {
    entries: Vec<PortMappingEntry>,
}

impl MappingWalk {
    /// Record the answer for the next index. Returns whether to ask for another.
    pub(crate) fn push(&mut self, answer: Result<PortMappingEntry, RequestError>) -> Result<bool, RequestError> {
        let entry = match answer {
            Ok(entry) => entry,
            Err(ref e) if ends_mapping_walk(e) => return Ok(false),
            Err(e) => return Err(e),
        };
        if self.entries.last() == Some(&entry) {
            warn!(
                "gateway answered index {} with the previous entry again, ending walk",
                self.entries.len()
            );
            return Ok(false);
        }
        self.entries.push(entry);
        if self.entries.len() >= MAX_MAPPING_ENTRIES {
            warn!("gateway listed {} mapping entries, ending walk", self.entries.len());
            return Ok(false);
        }
        Ok(true)
    }

    pub(crate) fn into_entries(self) -> Vec<PortMappingEntry> {
        self.entries
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.service.control_url())
    }
}
