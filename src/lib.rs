#![deny(missing_docs)]

//! An opinionated client for UPnP Internet Gateway Devices.
//!
//! Use [`discover`] to find the router on the local network, or [`load`] to
//! reconnect to one whose [`Gateway::location`] was recorded earlier. The
//! returned [`Gateway`] can report the external IP address and forward or
//! clear ports.
//!
//! Some deliberate restrictions:
//!
//! * Only the first gateway that answers is used.
//! * Mappings are symmetric: external port 9980 forwards to port 9980 on this host.
//! * TCP and UDP are always forwarded together.
//! * Mappings are permanent. They stay on the router until [`Gateway::clear`] is called.

#[macro_use]
extern crate log;

use std::fmt;

pub use self::common::parsing::PortMappingEntry;
pub use self::common::SearchOptions;
pub use self::discover::{discover, discover_with, load, select_service, SERVICE_PRIORITY};
pub use self::errors::{DiscoverError, GatewayError, RequestError, ResolveError, SearchError};
pub use self::gateway::Gateway;
pub use self::resolver::{find_internal_address, local_networks, resolve_internal_address};
pub use self::search::search_services;
pub use self::service::{ConnectionService, ServiceClient, ServiceType};

#[cfg(feature = "aio")]
pub mod aio;
mod common;
mod discover;
mod errors;
mod gateway;
mod resolver;
mod search;
mod service;
mod soap;

#[cfg(test)]
mod test_router;

/// Represents the protocols available for port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortMappingProtocol {
    /// TCP protocol
    TCP,
    /// UDP protocol
    UDP,
}

impl PortMappingProtocol {
    /// Both protocols, in the order a forward or clear applies them.
    pub const PAIR: [PortMappingProtocol; 2] = [PortMappingProtocol::TCP, PortMappingProtocol::UDP];
}

impl fmt::Display for PortMappingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                PortMappingProtocol::TCP => "TCP",
                PortMappingProtocol::UDP => "UDP",
            }
        )
    }
}
