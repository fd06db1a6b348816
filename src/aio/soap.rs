use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Client, Request};

use crate::errors::RequestError;
use crate::soap::{self, Action};

/// POST a SOAP envelope and return the response body, whatever the HTTP status.
pub async fn send_async(url: &str, action: Action, body: &str) -> Result<String, RequestError> {
    let client = Client::new();

    let req = Request::builder()
        .uri(url)
        .method("POST")
        .header(soap::HEADER_NAME, action.as_str())
        .header(CONTENT_TYPE, soap::CONTENT_TYPE)
        .header(CONTENT_LENGTH, body.len() as u64)
        .body(Body::from(body.to_string()))?;

    let resp = client.request(req).await?;
    let body = hyper::body::to_bytes(resp.into_body()).await?;

    Ok(String::from_utf8(body.to_vec())?)
}
