use std::io;
use std::net::IpAddr;

use if_addrs::{get_if_addrs, IfAddr};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::errors::ResolveError;

/// Work out which local address the device at `device_host` reaches this host on.
///
/// `device_host` is the host part of the URL the device advertises for itself and
/// must be an IP literal. The local networks are listed afresh on every call, and
/// the address of the first one containing the device is returned. There is no
/// fallback: a mapping to a guessed address would point at the wrong host.
pub fn resolve_internal_address(device_host: &str) -> Result<IpAddr, ResolveError> {
    resolve_with(device_host, local_networks)
}

/// Resolve against the networks `networks` lists instead of the live interfaces.
pub(crate) fn resolve_with<F>(device_host: &str, networks: F) -> Result<IpAddr, ResolveError>
where
    F: FnOnce() -> io::Result<Vec<IpNet>>,
{
    let device = parse_device_host(device_host)?;
    let networks = networks()?;
    find_internal_address(device, &networks).ok_or(ResolveError::InternalIpUnresolvable(device))
}

/// The address of the first network in `networks` that contains `device`.
pub fn find_internal_address(device: IpAddr, networks: &[IpNet]) -> Option<IpAddr> {
    networks
        .iter()
        .find(|network| network.contains(&device))
        .map(|network| network.addr())
}

/// Every address bound to a local interface, with its network prefix.
pub fn local_networks() -> io::Result<Vec<IpNet>> {
    let mut networks = Vec::new();
    for interface in get_if_addrs()? {
        let network = match interface.addr {
            IfAddr::V4(ref v4) => Ipv4Net::with_netmask(v4.ip, v4.netmask).map(IpNet::V4),
            IfAddr::V6(ref v6) => Ipv6Net::with_netmask(v6.ip, v6.netmask).map(IpNet::V6),
        };
        match network {
            Ok(network) => networks.push(network),
            Err(_) => debug!(
                "skipping address {} of {}: netmask is not a prefix",
                interface.ip(),
                interface.name
            ),
        }
    }
    Ok(networks)
}

fn parse_device_host(device_host: &str) -> Result<IpAddr, ResolveError> {
    // IPv6 hosts keep their brackets in URLs
    device_host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map_err(|_| ResolveError::InvalidDeviceAddress(device_host.to_string()))
}
