use crate::config::ClientConfig;
use crate::error_handling::map_reqwest_error;
use async_trait::async_trait;
use netcache_core::{ConfigError, HttpMethod, Result, TransportFailure};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::collections::BTreeMap;
use tracing::trace;
use url::Url;

/// A fully resolved request, ready to put on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded body
    pub body: Option<Vec<u8>>,
}

/// Raw status and body of an HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Something that can carry a request to a server and bring back its response.
///
/// Implementations must be cancel-safe: dropping the returned future aborts
/// the request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn issue(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportFailure>;
}

/// Production transport on a pooled [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(header_map(&config.default_headers)?)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| ConfigError::invalid_field("client", e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn issue(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportFailure> {
        trace!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_reqwest_error(&e))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::invalid_field(format!("headers.{name}"), e.to_string()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::invalid_field(format!("headers.{name}"), e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use netcache_core::FailureKind;

    fn config(base: &str) -> ClientConfig {
        ClientConfig::new(Url::parse(base).unwrap())
    }

    #[tokio::test]
    async fn test_issue_returns_status_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/games")
            .match_header("x-api-key", "secret")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let transport =
            ReqwestTransport::new(&config(&server.url()).with_header("X-Api-Key", "secret"))
                .unwrap();
        let response = transport
            .issue(TransportRequest {
                method: HttpMethod::Get,
                url: Url::parse(&format!("{}/games", server.url())).unwrap(),
                headers: BTreeMap::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response, TransportResponse::new(503, "maintenance"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_issue_sends_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_header("content-type", "application/json")
            .match_body(Matcher::JsonString(r#"{"query":"zelda"}"#.to_string()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let transport = ReqwestTransport::new(&config(&server.url())).unwrap();
        let response = transport
            .issue(TransportRequest {
                method: HttpMethod::Post,
                url: Url::parse(&format!("{}/search", server.url())).unwrap(),
                headers: BTreeMap::new(),
                body: Some(br#"{"query":"zelda"}"#.to_vec()),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = format!("http://{addr}/");
        let transport = ReqwestTransport::new(&config(&base)).unwrap();
        let failure = transport
            .issue(TransportRequest {
                method: HttpMethod::Get,
                url: Url::parse(&format!("{base}games")).unwrap(),
                headers: BTreeMap::new(),
                body: None,
            })
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Connect);
    }

    #[test]
    fn test_invalid_default_header_is_config_error() {
        let config = config("https://api.rawg.io/api/").with_header("bad header", "x");
        let result = ReqwestTransport::new(&config);
        assert!(matches!(result, Err(netcache_core::Error::Config(_))));
    }
}
