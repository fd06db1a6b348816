use std::error;
use std::fmt;
use std::io;
use std::net::IpAddr;
use std::str;
#[cfg(feature = "aio")]
use std::string::FromUtf8Error;

/// Errors that can occur when sending an action to the gateway.
#[derive(Debug)]
pub enum RequestError {
    /// attohttpc error
    AttoHttpError(attohttpc::Error),
    /// IO Error
    IoError(io::Error),
    /// The response from the gateway could not be parsed.
    InvalidResponse(String),
    /// The gateway returned a UPnP error code and description.
    ErrorCode(u16, String),
    /// Hyper error
    #[cfg(feature = "aio")]
    HyperError(hyper::Error),
    /// http crate error, raised while building a request
    #[cfg(feature = "aio")]
    HttpError(http::Error),
    /// The response body was not valid UTF-8.
    #[cfg(feature = "aio")]
    Utf8Error(FromUtf8Error),
}

impl RequestError {
    /// The UPnP error code reported by the gateway, if this is a fault.
    pub fn error_code(&self) -> Option<u16> {
        match *self {
            RequestError::ErrorCode(code, _) => Some(code),
            _ => None,
        }
    }
}

impl From<attohttpc::Error> for RequestError {
    fn from(err: attohttpc::Error) -> RequestError {
        RequestError::AttoHttpError(err)
    }
}

impl From<io::Error> for RequestError {
    fn from(err: io::Error) -> RequestError {
        RequestError::IoError(err)
    }
}

#[cfg(feature = "aio")]
impl From<hyper::Error> for RequestError {
    fn from(err: hyper::Error) -> RequestError {
        RequestError::HyperError(err)
    }
}

#[cfg(feature = "aio")]
impl From<http::Error> for RequestError {
    fn from(err: http::Error) -> RequestError {
        RequestError::HttpError(err)
    }
}

#[cfg(feature = "aio")]
impl From<FromUtf8Error> for RequestError {
    fn from(err: FromUtf8Error) -> RequestError {
        RequestError::Utf8Error(err)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RequestError::AttoHttpError(ref e) => write!(f, "HTTP error {}", e),
            RequestError::InvalidResponse(ref e) => write!(f, "Invalid response from gateway: {}", e),
            RequestError::IoError(ref e) => write!(f, "IO error. {}", e),
            RequestError::ErrorCode(n, ref e) => write!(f, "Gateway response error {}: {}", n, e),
            #[cfg(feature = "aio")]
            RequestError::HyperError(ref e) => write!(f, "Hyper Error: {}", e),
            #[cfg(feature = "aio")]
            RequestError::HttpError(ref e) => write!(f, "Http Error: {}", e),
            #[cfg(feature = "aio")]
            RequestError::Utf8Error(ref e) => write!(f, "Utf8 Error: {}", e),
        }
    }
}

impl error::Error for RequestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            RequestError::AttoHttpError(ref e) => Some(e),
            RequestError::InvalidResponse(..) => None,
            RequestError::IoError(ref e) => Some(e),
            RequestError::ErrorCode(..) => None,
            #[cfg(feature = "aio")]
            RequestError::HyperError(ref e) => Some(e),
            #[cfg(feature = "aio")]
            RequestError::HttpError(ref e) => Some(e),
            #[cfg(feature = "aio")]
            RequestError::Utf8Error(ref e) => Some(e),
        }
    }
}

/// Errors that can occur while searching for gateways or reading their descriptions.
#[derive(Debug)]
pub enum SearchError {
    /// Http/attohttpc error
    HttpError(attohttpc::Error),
    /// Unable to process the response
    InvalidResponse,
    /// IO Error
    IoError(io::Error),
    /// UTF-8 decoding error
    Utf8Error(str::Utf8Error),
    /// XML processing error
    XmlError(xmltree::ParseError),
    /// A URL in the response could not be parsed
    UrlError(url::ParseError),
    /// Error parsing URI
    #[cfg(feature = "aio")]
    InvalidUri(hyper::http::uri::InvalidUri),
    /// Hyper Error
    #[cfg(feature = "aio")]
    HyperError(hyper::Error),
}

impl From<attohttpc::Error> for SearchError {
    fn from(err: attohttpc::Error) -> SearchError {
        SearchError::HttpError(err)
    }
}

impl From<io::Error> for SearchError {
    fn from(err: io::Error) -> SearchError {
        SearchError::IoError(err)
    }
}

impl From<str::Utf8Error> for SearchError {
    fn from(err: str::Utf8Error) -> SearchError {
        SearchError::Utf8Error(err)
    }
}

impl From<xmltree::ParseError> for SearchError {
    fn from(err: xmltree::ParseError) -> SearchError {
        SearchError::XmlError(err)
    }
}

impl From<url::ParseError> for SearchError {
    fn from(err: url::ParseError) -> SearchError {
        SearchError::UrlError(err)
    }
}

#[cfg(feature = "aio")]
impl From<hyper::http::uri::InvalidUri> for SearchError {
    fn from(err: hyper::http::uri::InvalidUri) -> SearchError {
        SearchError::InvalidUri(err)
    }
}

#[cfg(feature = "aio")]
impl From<hyper::Error> for SearchError {
    fn from(err: hyper::Error) -> SearchError {
        SearchError::HyperError(err)
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SearchError::HttpError(ref e) => write!(f, "HTTP error {}", e),
            SearchError::InvalidResponse => write!(f, "Invalid response"),
            SearchError::IoError(ref e) => write!(f, "IO error: {}", e),
            SearchError::Utf8Error(ref e) => write!(f, "UTF-8 error: {}", e),
            SearchError::XmlError(ref e) => write!(f, "XML error: {}", e),
            SearchError::UrlError(ref e) => write!(f, "URL error: {}", e),
            #[cfg(feature = "aio")]
            SearchError::InvalidUri(ref e) => write!(f, "InvalidUri Error: {}", e),
            #[cfg(feature = "aio")]
            SearchError::HyperError(ref e) => write!(f, "Hyper Error: {}", e),
        }
    }
}

impl error::Error for SearchError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            SearchError::HttpError(ref e) => Some(e),
            SearchError::InvalidResponse => None,
            SearchError::IoError(ref e) => Some(e),
            SearchError::Utf8Error(ref e) => Some(e),
            SearchError::XmlError(ref e) => Some(e),
            SearchError::UrlError(ref e) => Some(e),
            #[cfg(feature = "aio")]
            SearchError::InvalidUri(ref e) => Some(e),
            #[cfg(feature = "aio")]
            SearchError::HyperError(ref e) => Some(e),
        }
    }
}

/// Errors returned by `discover` and `load`.
#[derive(Debug)]
pub enum DiscoverError {
    /// No device offering a supported connection service answered, or could be
    /// built from the given location.
    NoGatewayFound,
    /// The location passed to `load` is not a valid URL.
    InvalidLocation(url::ParseError),
}

impl From<url::ParseError> for DiscoverError {
    fn from(err: url::ParseError) -> DiscoverError {
        DiscoverError::InvalidLocation(err)
    }
}

impl fmt::Display for DiscoverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DiscoverError::NoGatewayFound => write!(f, "No UPnP-enabled gateway found"),
            DiscoverError::InvalidLocation(ref e) => write!(f, "Invalid gateway location: {}", e),
        }
    }
}

impl error::Error for DiscoverError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            DiscoverError::NoGatewayFound => None,
            DiscoverError::InvalidLocation(ref e) => Some(e),
        }
    }
}

/// Errors returned while working out which local address the gateway can reach.
#[derive(Debug)]
pub enum ResolveError {
    /// The host the gateway advertises is not an IP literal.
    InvalidDeviceAddress(String),
    /// None of the local networks contains the gateway address.
    InternalIpUnresolvable(IpAddr),
    /// The local network interfaces could not be listed.
    IoError(io::Error),
}

impl From<io::Error> for ResolveError {
    fn from(err: io::Error) -> ResolveError {
        ResolveError::IoError(err)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ResolveError::InvalidDeviceAddress(ref host) => {
                write!(f, "Could not determine the gateway's internal IP from host {:?}", host)
            }
            ResolveError::InternalIpUnresolvable(ref ip) => {
                write!(f, "Could not determine internal IP: no local network contains {}", ip)
            }
            ResolveError::IoError(ref e) => write!(f, "Could not list network interfaces: {}", e),
        }
    }
}

impl error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ResolveError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Errors returned by the `Gateway` operations.
#[derive(Debug)]
pub enum GatewayError {
    /// External port number 0 can not be forwarded or cleared.
    ExternalPortZeroInvalid,
    /// The local address to forward to could not be determined.
    ResolveError(ResolveError),
    /// The gateway rejected an action, or it could not be reached.
    RemoteActionFailed(RequestError),
}

impl GatewayError {
    /// The UPnP error code reported by the gateway, if the gateway faulted.
    pub fn error_code(&self) -> Option<u16> {
        match *self {
            GatewayError::RemoteActionFailed(ref e) => e.error_code(),
            _ => None,
        }
    }
}

impl From<ResolveError> for GatewayError {
    fn from(err: ResolveError) -> GatewayError {
        GatewayError::ResolveError(err)
    }
}

impl From<RequestError> for GatewayError {
    fn from(err: RequestError) -> GatewayError {
        GatewayError::RemoteActionFailed(err)
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GatewayError::ExternalPortZeroInvalid => write!(f, "External port number 0 can not be mapped"),
            GatewayError::ResolveError(ref e) => write!(f, "{}", e),
            GatewayError::RemoteActionFailed(ref e) => write!(f, "Request error. {}", e),
        }
    }
}

impl error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            GatewayError::ExternalPortZeroInvalid => None,
            GatewayError::ResolveError(ref e) => Some(e),
            GatewayError::RemoteActionFailed(ref e) => Some(e),
        }
    }
}
