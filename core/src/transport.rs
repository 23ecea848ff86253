//! Blocking transport backed by `ureq`.
//!
//! Status codes are returned as data (`http_status_as_error(false)`), so the
//! client alone decides what a 404 or 409 means.

use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    max_response_bytes: u64,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref().map(str::as_bytes);

        let result = match (request.method, body) {
            (HttpMethod::Head, _) => prepare(self.agent.head(url), request).call(),
            (HttpMethod::Get, None) => prepare(self.agent.get(url), request).call(),
            (HttpMethod::Get, Some(body)) => prepare(self.agent.get(url), request)
                .force_send_body()
                .send(body),
            (HttpMethod::Delete, None) => prepare(self.agent.delete(url), request).call(),
            (HttpMethod::Delete, Some(body)) => prepare(self.agent.delete(url), request)
                .force_send_body()
                .send(body),
            (HttpMethod::Post, Some(body)) => prepare(self.agent.post(url), request).send(body),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => prepare(self.agent.put(url), request).send(body),
            (HttpMethod::Put, None) => prepare(self.agent.put(url), request).send_empty(),
        };
        let mut response = result.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            String::new()
        } else {
            let bytes = response
                .body_mut()
                .with_config()
                .limit(self.max_response_bytes)
                .read_to_vec()
                .map_err(transport_error)?;
            // A proxy error page need not be UTF-8; the status still counts.
            String::from_utf8(bytes).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match request.timeout {
        Some(timeout) => builder.config().timeout_global(Some(timeout)).build(),
        None => builder,
    }
}

fn transport_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(err) => TransportError::Io(err),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportError::Connect(err.to_string()),
        other => TransportError::Other(other.to_string()),
    }
}
