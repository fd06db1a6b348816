use xml::escape::escape_str_pcdata;

use crate::PortMappingEntry;
use crate::PortMappingProtocol;

pub const GET_EXTERNAL_IP_ACTION: &str = "GetExternalIPAddress";
pub const ADD_PORT_MAPPING_ACTION: &str = "AddPortMapping";
pub const DELETE_PORT_MAPPING_ACTION: &str = "DeletePortMapping";
pub const GET_GENERIC_PORT_MAPPING_ENTRY_ACTION: &str = "GetGenericPortMappingEntry";

pub fn format_search_request(service_type: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r
Host:239.255.255.250:1900\r
ST:{}\r
Man:\"ssdp:discover\"\r
MX:3\r\n\r\n",
        service_type
    )
}

/// Value of the SOAPAction header for `action` in the `service_type` namespace.
pub fn format_action_header(service_type: &str, action: &str) -> String {
    format!("\"{}#{}\"", service_type, action)
}

/// Name of the element wrapping a successful reply to `action`.
pub fn response_name(action: &str) -> String {
    format!("{}Response", action)
}

fn format_envelope(service_type: &str, action: &str, arguments: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>
<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">
<s:Body>
    <u:{action} xmlns:u=\"{service}\">{arguments}
    </u:{action}>
</s:Body>
</s:Envelope>",
        action = action,
        service = service_type,
        arguments = arguments,
    )
}

pub fn format_get_external_ip_message(service_type: &str) -> String {
    format_envelope(service_type, GET_EXTERNAL_IP_ACTION, "")
}

pub fn format_add_port_mapping_message(service_type: &str, mapping: &PortMappingEntry) -> String {
    let arguments = format!(
        "
        <NewRemoteHost>{}</NewRemoteHost>
        <NewExternalPort>{}</NewExternalPort>
        <NewProtocol>{}</NewProtocol>
        <NewInternalPort>{}</NewInternalPort>
        <NewInternalClient>{}</NewInternalClient>
        <NewEnabled>{}</NewEnabled>
        <NewPortMappingDescription>{}</NewPortMappingDescription>
        <NewLeaseDuration>{}</NewLeaseDuration>",
        escape_str_pcdata(&mapping.remote_host),
        mapping.external_port,
        mapping.protocol,
        mapping.internal_port,
        escape_str_pcdata(&mapping.internal_client),
        if mapping.enabled { 1 } else { 0 },
        escape_str_pcdata(&mapping.port_mapping_description),
        mapping.lease_duration,
    );
    format_envelope(service_type, ADD_PORT_MAPPING_ACTION, &arguments)
}

pub fn format_delete_port_message(
    service_type: &str,
    remote_host: &str,
    external_port: u16,
    protocol: PortMappingProtocol,
) -> String {
    let arguments = format!(
        "
        <NewRemoteHost>{}</NewRemoteHost>
        <NewExternalPort>{}</NewExternalPort>
        <NewProtocol>{}</NewProtocol>",
        escape_str_pcdata(remote_host),
        external_port,
        protocol,
    );
    format_envelope(service_type, DELETE_PORT_MAPPING_ACTION, &arguments)
}

pub fn format_get_generic_port_mapping_entry_message(service_type: &str, index: u32) -> String {
    let arguments = format!(
        "
        <NewPortMappingIndex>{}</NewPortMappingIndex>",
        index
    );
    format_envelope(service_type, GET_GENERIC_PORT_MAPPING_ENTRY_ACTION, &arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAN_IP: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

    #[test]
    fn test_search_request_names_target() {
        let request = format_search_request(WAN_IP);
        assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(request.contains(&format!("ST:{}\r\n", WAN_IP)));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_action_header_is_quoted() {
        assert_eq!(
            format_action_header(WAN_IP, DELETE_PORT_MAPPING_ACTION),
            "\"urn:schemas-upnp-org:service:WANIPConnection:1#DeletePortMapping\""
        );
    }

    #[test]
    fn test_add_port_mapping_escapes_description() {
        let mapping = PortMappingEntry {
            remote_host: String::new(),
            external_port: 9001,
            protocol: PortMappingProtocol::UDP,
            internal_port: 9001,
            internal_client: "192.168.1.50".into(),
            enabled: true,
            port_mapping_description: "a <b> & c".into(),
            lease_duration: 0,
        };
        let body = format_add_port_mapping_message(WAN_IP, &mapping);
        assert!(body.contains("<u:AddPortMapping xmlns:u=\"urn:schemas-upnp-org:service:WANIPConnection:1\">"));
        assert!(body.contains("<NewPortMappingDescription>a &lt;b"));
        assert!(body.contains(" &amp; c</NewPortMappingDescription>"));
        assert!(body.contains("<NewProtocol>UDP</NewProtocol>"));
        assert!(body.contains("<NewEnabled>1</NewEnabled>"));
        assert!(body.contains("<NewLeaseDuration>0</NewLeaseDuration>"));
    }
}
