use std::time::Duration;

use async_trait::async_trait;
use client::{Connector, Endpoint, Method, Request, Transport, TransportError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::debug;

use crate::HttpConfig;

const APPLICATION_JSON: &str = "application/json";

/// Builds an [`HttpTransport`] from an [`HttpConfig`].
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: HttpConfig,
}

impl HttpConnector {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, endpoint: &Endpoint) -> Result<HttpTransport, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(self.config.user_agent.as_str());
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Setup {
            message: e.to_string(),
        })?;

        Ok(HttpTransport {
            client,
            origin: endpoint.origin(),
        })
    }
}

/// reqwest-backed [`Transport`] bound to one engine origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    origin: Url,
}

impl HttpTransport {
    fn url_for(&self, request: &Request) -> Url {
        let mut url = self.origin.clone();
        url.set_path(&request.path);
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Value, TransportError> {
        let url = self.url_for(&request);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            // `.json` also sets `Content-Type: application/json`.
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| send_error(&url, e))?;
        let status = response.status();
        debug!(method = %request.method, %url, status = status.as_u16(), "engine responded");

        if !status.is_success() {
            return Err(status_error(&url, response).await);
        }

        let bytes = response.bytes().await.map_err(|e| send_error(&url, e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn send_error(url: &Url, error: reqwest::Error) -> TransportError {
    let url = url.to_string();
    if error.is_timeout() {
        TransportError::Timeout { url }
    } else if error.is_connect() {
        TransportError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        TransportError::Other {
            url,
            message: error.to_string(),
        }
    }
}

async fn status_error(url: &Url, response: Response) -> TransportError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    TransportError::Status {
        url: url.to_string(),
        status,
        body,
        retry_after,
    }
}
