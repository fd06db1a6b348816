//! A router on the loopback interface, answering SSDP searches and the SOAP
//! actions this crate sends.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use xmltree::{Element, XMLNode};

use crate::common::SearchOptions;
use crate::service::ServiceType;
use crate::{PortMappingEntry, PortMappingProtocol};

const DESCRIPTION_PATH: &str = "/rootDesc.xml";

pub struct RouterConfig {
    /// The one connection service the router exposes.
    pub service_type: ServiceType,
    pub external_ip: String,
    /// `<URLBase>` to advertise; `{port}` is replaced by the HTTP port.
    pub url_base: Option<String>,
    /// Answer AddPortMapping for this protocol and port with a conflict.
    pub reject: Option<(PortMappingProtocol, u16)>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            service_type: ServiceType::WanIpConnection,
            external_ip: "203.0.113.7".to_string(),
            url_base: None,
            reject: None,
        }
    }
}

struct State {
    config: RouterConfig,
    http_addr: SocketAddr,
    mappings: Mutex<Vec<PortMappingEntry>>,
    searches: AtomicUsize,
    stopped: AtomicBool,
}

pub struct TestRouter {
    state: Arc<State>,
    ssdp_addr: SocketAddr,
}

impl TestRouter {
    pub fn start(config: RouterConfig) -> TestRouter {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let ssdp = UdpSocket::bind("127.0.0.1:0").unwrap();
        ssdp.set_read_timeout(Some(Duration::from_millis(50))).unwrap();

        let state = Arc::new(State {
            config,
            http_addr: listener.local_addr().unwrap(),
            mappings: Mutex::new(Vec::new()),
            searches: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        });
        let ssdp_addr = ssdp.local_addr().unwrap();

        let ssdp_state = state.clone();
        thread::spawn(move || answer_searches(ssdp, ssdp_state));
        let http_state = state.clone();
        thread::spawn(move || serve_http(listener, http_state));

        TestRouter { state, ssdp_addr }
    }

    /// URL of the device description.
    pub fn location(&self) -> String {
        format!("http://{}{}", self.state.http_addr, DESCRIPTION_PATH)
    }

    /// Options that send searches to this router only.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            broadcast_address: self.ssdp_addr,
            timeout: Some(Duration::from_millis(500)),
        }
    }

    /// A loopback address nothing listens on.
    pub fn closed_address(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    pub fn mappings(&self) -> Vec<PortMappingEntry> {
        self.state.mappings.lock().unwrap().clone()
    }

    /// Number of search requests received, for any target.
    pub fn search_count(&self) -> usize {
        self.state.searches.load(Ordering::SeqCst)
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        self.state.stopped.store(true, Ordering::SeqCst);
        // wake the accept loop
        let _ = TcpStream::connect(self.state.http_addr);
    }
}

fn answer_searches(socket: UdpSocket, state: Arc<State>) {
    let mut buf = [0u8; 1500];
    while !state.stopped.load(Ordering::SeqCst) {
        let (read, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(_) => continue,
        };
        state.searches.fetch_add(1, Ordering::SeqCst);

        let request = String::from_utf8_lossy(&buf[..read]);
        let target = request
            .lines()
            .filter_map(|line| line.find(':').map(|colon| (&line[..colon], line[colon + 1..].trim())))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("st"))
            .map(|(_, value)| value.to_string());
        let urn = state.config.service_type.urn();
        if target.as_deref() != Some(urn) {
            continue;
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=120\r\nST: {}\r\nUSN: uuid:test-router::{}\r\nEXT:\r\nSERVER: test/1.0 UPnP/1.1\r\nLOCATION: http://{}{}\r\n\r\n",
            urn, urn, state.http_addr, DESCRIPTION_PATH
        );
        let _ = socket.send_to(response.as_bytes(), from);
    }
}

fn serve_http(listener: TcpListener, state: Arc<State>) {
    for stream in listener.incoming() {
        if state.stopped.load(Ordering::SeqCst) {
            break;
        }
        if let Ok(stream) = stream {
            let state = state.clone();
            thread::spawn(move || {
                let _ = handle_connection(stream, &state);
            });
        }
    }
}

struct HttpRequest {
    method: String,
    path: String,
    soap_action: Option<String>,
    body: String,
}

fn read_request(stream: &TcpStream) -> std::io::Result<HttpRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut content_length = 0;
    let mut soap_action = None;
    loop {
        line.clear();
        reader.read_line(&mut line)?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some(colon) = header.find(':') {
            let (name, value) = (header[..colon].trim(), header[colon + 1..].trim());
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("soapaction") {
                soap_action = Some(value.to_string());
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(HttpRequest {
        method,
        path,
        soap_action,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn handle_connection(mut stream: TcpStream, state: &State) -> std::io::Result<()> {
    let request = read_request(&stream)?;
    let (status, body) = match (request.method.as_str(), request.path.as_str()) {
        ("GET", DESCRIPTION_PATH) => ("200 OK", description(state)),
        ("POST", path) if path == control_path(state.config.service_type) => handle_action(&request, state),
        _ => ("404 Not Found", "not found".to_string()),
    };
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/xml; charset=\"utf-8\"\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()
}

fn control_path(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::WanIpConnection => "/ctl/IPConn",
        ServiceType::WanPppConnection => "/ctl/PPPConn",
    }
}

fn description(state: &State) -> String {
    let url_base = match state.config.url_base {
        Some(ref base) => format!(
            "<URLBase>{}</URLBase>",
            base.replace("{port}", &state.http_addr.port().to_string())
        ),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  {url_base}
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <controlURL>/ctl/L3F</controlURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <serviceList>
              <service>
                <serviceType>{service_type}</serviceType>
                <controlURL>{control_url}</controlURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
  </device>
</root>"#,
        url_base = url_base,
        service_type = state.config.service_type.urn(),
        control_url = control_path(state.config.service_type),
    )
}

fn handle_action(request: &HttpRequest, state: &State) -> (&'static str, String) {
    let urn = state.config.service_type.urn();
    let action = match Element::parse(request.body.as_bytes())
        .ok()
        .and_then(|envelope| envelope.get_child("Body").cloned())
        .and_then(|body| first_element(&body).cloned())
    {
        Some(action) => action,
        None => return fault(401, "Invalid Action"),
    };

    let expected = format!("\"{}#{}\"", urn, action.name);
    if request.soap_action.as_deref() != Some(expected.as_str()) {
        return fault(401, "Invalid Action");
    }

    let arg = |name: &str| {
        action
            .get_child(name)
            .and_then(|e| e.get_text())
            .map(|t| t.into_owned())
            .unwrap_or_default()
    };
    let protocol = || match arg("NewProtocol").as_str() {
        "TCP" => Some(PortMappingProtocol::TCP),
        "UDP" => Some(PortMappingProtocol::UDP),
        _ => None,
    };

    let mut mappings = state.mappings.lock().unwrap();
    match action.name.as_str() {
        "GetExternalIPAddress" => ok(
            urn,
            &action.name,
            &format!("<NewExternalIPAddress>{}</NewExternalIPAddress>", state.config.external_ip),
        ),
        "AddPortMapping" => {
            let (protocol, external_port) = match (protocol(), arg("NewExternalPort").parse::<u16>()) {
                (Some(protocol), Ok(port)) => (protocol, port),
                _ => return fault(402, "Invalid Args"),
            };
            if state.config.reject == Some((protocol, external_port)) {
                return fault(718, "ConflictInMappingEntry");
            }
            let entry = PortMappingEntry {
                remote_host: arg("NewRemoteHost"),
                external_port,
                protocol,
                internal_port: arg("NewInternalPort").parse().unwrap_or(0),
                internal_client: arg("NewInternalClient"),
                enabled: arg("NewEnabled") == "1",
                port_mapping_description: arg("NewPortMappingDescription"),
                lease_duration: arg("NewLeaseDuration").parse().unwrap_or(0),
            };
            let existing = mappings
                .iter()
                .position(|m| m.external_port == external_port && m.protocol == protocol);
            match existing {
                Some(i) if mappings[i].internal_client != entry.internal_client => {
                    return fault(718, "ConflictInMappingEntry")
                }
                Some(i) => mappings[i] = entry,
                None => mappings.push(entry),
            }
            ok(urn, &action.name, "")
        }
        "DeletePortMapping" => {
            let (protocol, external_port) = match (protocol(), arg("NewExternalPort").parse::<u16>()) {
                (Some(protocol), Ok(port)) => (protocol, port),
                _ => return fault(402, "Invalid Args"),
            };
            match mappings
                .iter()
                .position(|m| m.external_port == external_port && m.protocol == protocol)
            {
                Some(i) => {
                    mappings.remove(i);
                    ok(urn, &action.name, "")
                }
                None => fault(714, "NoSuchEntryInArray"),
            }
        }
        "GetGenericPortMappingEntry" => {
            let index = arg("NewPortMappingIndex").parse::<usize>().unwrap_or(usize::MAX);
            match mappings.get(index) {
                Some(m) => ok(
                    urn,
                    &action.name,
                    &format!(
                        "<NewRemoteHost>{}</NewRemoteHost><NewExternalPort>{}</NewExternalPort><NewProtocol>{}</NewProtocol><NewInternalPort>{}</NewInternalPort><NewInternalClient>{}</NewInternalClient><NewEnabled>{}</NewEnabled><NewPortMappingDescription>{}</NewPortMappingDescription><NewLeaseDuration>{}</NewLeaseDuration>",
                        m.remote_host,
                        m.external_port,
                        m.protocol,
                        m.internal_port,
                        m.internal_client,
                        if m.enabled { 1 } else { 0 },
                        xml::escape::escape_str_pcdata(&m.port_mapping_description),
                        m.lease_duration
                    ),
                ),
                None => fault(713, "SpecifiedArrayIndexInvalid"),
            }
        }
        _ => fault(401, "Invalid Action"),
    }
}

fn first_element(element: &Element) -> Option<&Element> {
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

fn ok(urn: &str, action: &str, arguments: &str) -> (&'static str, String) {
    (
        "200 OK",
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><u:{action}Response xmlns:u="{urn}">{arguments}</u:{action}Response></s:Body>
</s:Envelope>"#,
            action = action,
            urn = urn,
            arguments = arguments
        ),
    )
}

fn fault(code: u16, description: &str) -> (&'static str, String) {
    (
        "500 Internal Server Error",
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail>
<UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>{}</errorCode><errorDescription>{}</errorDescription></UPnPError>
</detail></s:Fault></s:Body>
</s:Envelope>"#,
            code, description
        ),
    )
}
