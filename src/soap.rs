use crate::errors::RequestError;

#[derive(Clone, Debug)]
pub struct Action(String);

impl Action {
    pub fn new(action: &str) -> Action {
        Action(action.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub const HEADER_NAME: &str = "SOAPAction";
pub const CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// POST a SOAP envelope and return the response body, whatever the HTTP status.
///
/// Gateways report faults with a 500 status and the details in the body.
pub fn send(url: &str, action: Action, body: &str) -> Result<String, RequestError> {
    Ok(attohttpc::post(url)
        .header(HEADER_NAME, action.as_str())
        .header("Content-Type", CONTENT_TYPE)
        .text(body)
        .send()?
        .text()?)
}
