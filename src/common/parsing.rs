use std::io;

use url::Url;
use xmltree::{Element, XMLNode};

use crate::errors::{RequestError, SearchError};
use crate::PortMappingProtocol;

/// Parse an SSDP search response and return the device description location.
///
/// Responses that announce a search target other than `search_target` are rejected.
pub fn parse_search_result(text: &str, search_target: &str) -> Result<Url, SearchError> {
    use SearchError::InvalidResponse;

    let mut location = None;
    for line in text.lines() {
        let line = line.trim();
        let colon = match line.find(':') {
            Some(colon) => colon,
            None => continue,
        };
        let (name, value) = (line[..colon].trim(), line[colon + 1..].trim());
        if name.eq_ignore_ascii_case("location") {
            location = Some(Url::parse(value).map_err(|_| InvalidResponse)?);
        } else if name.eq_ignore_ascii_case("st") && value != search_target {
            debug!("ignoring search response for {:?}", value);
            return Err(InvalidResponse);
        }
    }
    location.ok_or(InvalidResponse)
}

/// One `<service>` entry of a device description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub service_type: String,
    pub control_url: String,
}

/// The parts of a device description this crate needs.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    /// `<URLBase>`, or the description location when the device omits it.
    pub base_url: Url,
    /// Every service of the root device and its embedded devices, depth first.
    pub services: Vec<ServiceEntry>,
}

impl DeviceDescription {
    /// Absolute control URLs of every service of the given type, in document order.
    pub fn control_urls(&self, service_type: &str) -> Result<Vec<Url>, SearchError> {
        let mut urls = Vec::new();
        for service in self.services.iter().filter(|s| s.service_type == service_type) {
            urls.push(self.base_url.join(&service.control_url)?);
        }
        Ok(urls)
    }
}

pub fn parse_description<R>(resp: R, location: &Url) -> Result<DeviceDescription, SearchError>
where
    R: io::Read,
{
    let root = Element::parse(resp)?;

    let base_url = match child_text(&root, "URLBase") {
        Some(ref base) if !base.is_empty() => Url::parse(base)?,
        _ => location.clone(),
    };

    let device = root.get_child("device").ok_or(SearchError::InvalidResponse)?;
    let mut services = Vec::new();
    scan_device(device, &mut services);

    Ok(DeviceDescription { base_url, services })
}

fn scan_device(device: &Element, services: &mut Vec<ServiceEntry>) {
    if let Some(service_list) = device.get_child("serviceList") {
        for service in child_elements(service_list).filter(|e| e.name == "service") {
            let service_type = child_text(service, "serviceType");
            let control_url = child_text(service, "controlURL");
            if let (Some(service_type), Some(control_url)) = (service_type, control_url) {
                if !control_url.is_empty() {
                    services.push(ServiceEntry {
                        service_type,
                        control_url,
                    });
                }
            }
        }
    }

    if let Some(device_list) = device.get_child("deviceList") {
        for sub_device in child_elements(device_list).filter(|e| e.name == "device") {
            scan_device(sub_device, services);
        }
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

/// Trimmed text of the named child, empty when the child has no text.
fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .map(|c| c.get_text().map(|t| t.trim().to_string()).unwrap_or_default())
}

pub struct RequestReponse {
    text: String,
    xml: Element,
}

pub type RequestResult = Result<RequestReponse, RequestError>;

pub fn parse_response(text: String, ok: &str) -> RequestResult {
    let mut xml = match Element::parse(text.as_bytes()) {
        Ok(xml) => xml,
        Err(..) => return Err(RequestError::InvalidResponse(text)),
    };
    let body = match xml.get_mut_child("Body") {
        Some(body) => body,
        None => return Err(RequestError::InvalidResponse(text)),
    };
    if let Some(ok) = body.take_child(ok) {
        return Ok(RequestReponse { text, xml: ok });
    }
    let upnp_error = match body
        .get_child("Fault")
        .and_then(|e| e.get_child("detail"))
        .and_then(|e| e.get_child("UPnPError"))
    {
        Some(upnp_error) => upnp_error,
        None => return Err(RequestError::InvalidResponse(text)),
    };

    let code = child_text(upnp_error, "errorCode").and_then(|c| c.parse::<u16>().ok());
    match code {
        Some(code) => {
            let description = child_text(upnp_error, "errorDescription").unwrap_or_default();
            Err(RequestError::ErrorCode(code, description))
        }
        None => Err(RequestError::InvalidResponse(text)),
    }
}

/// The external address exactly as the gateway reported it.
pub fn parse_get_external_ip_response(result: RequestResult) -> Result<String, RequestError> {
    let resp = result?;
    match resp.xml.get_child("NewExternalIPAddress") {
        Some(e) => Ok(e.get_text().map(|t| t.into_owned()).unwrap_or_default()),
        None => Err(RequestError::InvalidResponse(resp.text)),
    }
}

/// One port mapping entry, as sent with AddPortMapping or returned by GetGenericPortMappingEntry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMappingEntry {
    /// The remote host for which the mapping is valid
    /// Can be an IP address or a host name, empty for any host
    pub remote_host: String,
    /// The external port of the mapping
    pub external_port: u16,
    /// The protocol of the mapping
    pub protocol: PortMappingProtocol,
    /// The internal (local) port
    pub internal_port: u16,
    /// The internal client of the port mapping
    /// Can be an IP address or a host name
    pub internal_client: String,
    /// A flag whether this port mapping is enabled
    pub enabled: bool,
    /// A description for this port mapping
    pub port_mapping_description: String,
    /// The lease duration of this port mapping in seconds, 0 for permanent
    pub lease_duration: u32,
}

pub fn parse_get_generic_port_mapping_entry(result: RequestResult) -> Result<PortMappingEntry, RequestError> {
    let response = result?;
    let xml = response.xml;
    let invalid = |msg: String| RequestError::InvalidResponse(msg);
    let extract_field = |field: &str| child_text(&xml, field).ok_or_else(|| invalid(format!("{} is missing", field)));
    let parse_number = |field: &str| {
        extract_field(field).and_then(|t| {
            t.parse::<u32>()
                .map_err(|_| invalid(format!("Field {} is invalid", field)))
        })
    };

    let remote_host = extract_field("NewRemoteHost")?;
    let external_port = parse_number("NewExternalPort")?;
    let protocol = match extract_field("NewProtocol")?.as_str() {
        "UDP" => PortMappingProtocol::UDP,
        "TCP" => PortMappingProtocol::TCP,
        _ => return Err(invalid("Field NewProtocol is invalid".into())),
    };
    let internal_port = parse_number("NewInternalPort")?;
    let internal_client = extract_field("NewInternalClient")?;
    let enabled = match parse_number("NewEnabled")? {
        0 => false,
        1 => true,
        _ => return Err(invalid("Field NewEnabled is invalid".into())),
    };
    let port_mapping_description = extract_field("NewPortMappingDescription")?;
    let lease_duration = parse_number("NewLeaseDuration")?;

    if external_port > u32::from(u16::MAX) || internal_port > u32::from(u16::MAX) {
        return Err(invalid("Port field out of range".into()));
    }

    Ok(PortMappingEntry {
        remote_host,
        external_port: external_port as u16,
        protocol,
        internal_port: internal_port as u16,
        internal_client,
        enabled,
        port_mapping_description,
        lease_duration,
    })
}

#[test]
fn test_parse_search_result_case_insensitivity() {
    let st = "urn:schemas-upnp-org:service:WANIPConnection:1";
    assert!(parse_search_result("location:http://0.0.0.0:0/control_url", st).is_ok());
    assert!(parse_search_result("LOCATION:http://0.0.0.0:0/control_url", st).is_ok());
}

#[test]
fn test_parse_search_result_ok() {
    let st = "urn:schemas-upnp-org:service:WANPPPConnection:1";
    let text = "HTTP/1.1 200 OK\r\n\
                CACHE-CONTROL: max-age=120\r\n\
                ST: urn:schemas-upnp-org:service:WANPPPConnection:1\r\n\
                LOCATION: http://192.168.1.1:5000/rootDesc.xml\r\n\r\n";
    let result = parse_search_result(text, st).unwrap();
    assert_eq!(result.as_str(), "http://192.168.1.1:5000/rootDesc.xml");
}

#[test]
fn test_parse_search_result_fail() {
    let st = "urn:schemas-upnp-org:service:WANIPConnection:1";
    assert!(parse_search_result("content-type:http://0.0.0.0:0/control_url", st).is_err());
}

#[test]
fn test_parse_search_result_other_target() {
    let text = "ST: urn:schemas-upnp-org:service:WANIPConnection:1\r\n\
                LOCATION: http://192.168.1.1:5000/rootDesc.xml\r\n\r\n";
    assert!(parse_search_result(text, "urn:schemas-upnp-org:service:WANPPPConnection:1").is_err());
}

#[cfg(test)]
const MINIUPNPD_DESCRIPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
   <specVersion>
      <major>1</major>
      <minor>0</minor>
   </specVersion>
   <device>
      <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
      <friendlyName></friendlyName>
      <serviceList>
         <service>
            <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
            <serviceId>urn:upnp-org:serviceId:Layer3Forwarding1</serviceId>
            <controlURL>/ctl/L3F</controlURL>
            <eventSubURL>/evt/L3F</eventSubURL>
            <SCPDURL>/L3F.xml</SCPDURL>
         </service>
      </serviceList>
      <deviceList>
         <device>
            <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
            <serviceList>
               <service>
                  <serviceType>urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1</serviceType>
                  <serviceId>urn:upnp-org:serviceId:WANCommonIFC1</serviceId>
                  <controlURL>/ctl/CmnIfCfg</controlURL>
                  <eventSubURL>/evt/CmnIfCfg</eventSubURL>
                  <SCPDURL>/WANCfg.xml</SCPDURL>
               </service>
            </serviceList>
            <deviceList>
               <device>
                  <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
                  <serviceList>
                     <service>
                        <serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType>
                        <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
                        <controlURL>/ctl/IPConn</controlURL>
                        <eventSubURL>/evt/IPConn</eventSubURL>
                        <SCPDURL>/WANIPCn.xml</SCPDURL>
                     </service>
                  </serviceList>
               </device>
            </deviceList>
         </device>
      </deviceList>
      <presentationURL>http://192.168.0.1/</presentationURL>
   </device>
</root>"#;

#[test]
fn test_parse_description_nested_services() {
    let location = Url::parse("http://192.168.0.1:5000/rootDesc.xml").unwrap();
    let description = parse_description(MINIUPNPD_DESCRIPTION.as_bytes(), &location).unwrap();
    assert_eq!(description.base_url, location);
    assert_eq!(description.services.len(), 3);

    let urls = description
        .control_urls("urn:schemas-upnp-org:service:WANIPConnection:1")
        .unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].as_str(), "http://192.168.0.1:5000/ctl/IPConn");

    assert!(description
        .control_urls("urn:schemas-upnp-org:service:WANPPPConnection:1")
        .unwrap()
        .is_empty());
}

#[test]
fn test_parse_description_url_base() {
    let text = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <URLBase>http://10.0.0.138:49152/</URLBase>
  <device>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:WANPPPConnection:1</serviceType>
        <controlURL>upnp/control/WANPPPConn1</controlURL>
      </service>
      <service>
        <serviceType>urn:schemas-upnp-org:service:WANPPPConnection:1</serviceType>
        <controlURL>http://10.0.0.138:49153/upnp/control/WANPPPConn2</controlURL>
      </service>
    </serviceList>
  </device>
</root>"#;
    let location = Url::parse("http://10.0.0.138:1900/gatedesc.xml").unwrap();
    let description = parse_description(text.as_bytes(), &location).unwrap();
    assert_eq!(description.base_url.as_str(), "http://10.0.0.138:49152/");

    let urls = description
        .control_urls("urn:schemas-upnp-org:service:WANPPPConnection:1")
        .unwrap();
    assert_eq!(urls[0].as_str(), "http://10.0.0.138:49152/upnp/control/WANPPPConn1");
    assert_eq!(urls[1].as_str(), "http://10.0.0.138:49153/upnp/control/WANPPPConn2");
}

#[test]
fn test_parse_description_without_device() {
    let location = Url::parse("http://10.0.0.1/desc.xml").unwrap();
    let text = r#"<?xml version="1.0"?><root><specVersion/></root>"#;
    assert!(parse_description(text.as_bytes(), &location).is_err());
}

#[test]
fn test_parse_response_fault() {
    let text = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body>
<s:Fault>
<faultcode>s:Client</faultcode>
<faultstring>UPnPError</faultstring>
<detail>
<UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
<errorCode>718</errorCode>
<errorDescription>ConflictInMappingEntry</errorDescription>
</UPnPError>
</detail>
</s:Fault>
</s:Body>
</s:Envelope>"#;
    match parse_response(text.to_string(), "AddPortMappingResponse") {
        Err(RequestError::ErrorCode(718, ref description)) => assert_eq!(description, "ConflictInMappingEntry"),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("fault parsed as success"),
    }
}

#[test]
fn test_parse_external_ip_verbatim() {
    let text = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body>
<u:GetExternalIPAddressResponse xmlns:u="urn:schemas-upnp-org:service:WANIPConnection:1">
<NewExternalIPAddress>203.0.113.7</NewExternalIPAddress>
</u:GetExternalIPAddressResponse>
</s:Body>
</s:Envelope>"#;
    let result = parse_response(text.to_string(), "GetExternalIPAddressResponse");
    assert_eq!(parse_get_external_ip_response(result).unwrap(), "203.0.113.7");
}

#[test]
fn test_parse_generic_port_mapping_entry() {
    let text = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body>
<u:GetGenericPortMappingEntryResponse xmlns:u="urn:schemas-upnp-org:service:WANIPConnection:1">
<NewRemoteHost></NewRemoteHost>
<NewExternalPort>9001</NewExternalPort>
<NewProtocol>TCP</NewProtocol>
<NewInternalPort>9001</NewInternalPort>
<NewInternalClient>192.168.1.50</NewInternalClient>
<NewEnabled>1</NewEnabled>
<NewPortMappingDescription>test</NewPortMappingDescription>
<NewLeaseDuration>0</NewLeaseDuration>
</u:GetGenericPortMappingEntryResponse>
</s:Body>
</s:Envelope>"#;
    let result = parse_response(text.to_string(), "GetGenericPortMappingEntryResponse");
    let entry = parse_get_generic_port_mapping_entry(result).unwrap();
    assert_eq!(entry.external_port, 9001);
    assert_eq!(entry.protocol, PortMappingProtocol::TCP);
    assert_eq!(entry.internal_client, "192.168.1.50");
    assert!(entry.enabled);
    assert_eq!(entry.remote_host, "");
    assert_eq!(entry.lease_duration, 0);
}
