// # reqwest HTTP Transport
//
// This crate provides the production `HttpTransport` for cfddns.
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (Transport)
//
// **Allowed Capabilities**:
// - ✅ Perform one HTTP/HTTPS exchange per call
// - ✅ Apply the configured per-request timeout
// - ✅ Route through the configured HTTP/HTTPS proxies
//
// **Forbidden Capabilities**:
// - ❌ Retry (owned by `CloudflareClient`)
// - ❌ Interpret status codes or bodies (owned by `CloudflareClient`)
// - ❌ Read proxies from the environment behind the caller's back
//
// ## Security Requirements
//
// - Credential headers NEVER appear in logs
//
// ## Failure Split
//
// | outcome                                  | result                 |
// |------------------------------------------|------------------------|
// | any HTTP status, body read completely     | `Ok(HttpResponse)`     |
// | timeout, refused/reset connection, TLS   | `Err(Error::Transport)` |
// | request could not be built               | `Err(Error::Config)`   |

use async_trait::async_trait;
use cfddns_core::config::{ClientConfig, ProxyConfig};
use cfddns_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use cfddns_core::{Error, Result};

/// User agent sent with every request
const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
    proxy: ProxyConfig,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl ReqwestTransport {
    /// Build a transport from the client configuration
    ///
    /// Proxies come only from `config.proxy`; when none is set, environment
    /// proxy variables are ignored as well.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let proxy = config.proxy.normalized();

        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT);

        if proxy.is_empty() {
            builder = builder.no_proxy();
        }
        if let Some(url) = &proxy.http {
            let http = reqwest::Proxy::http(url)
                .map_err(|e| Error::config(format!("Invalid HTTP proxy {url:?}: {e}")))?;
            builder = builder.proxy(http);
        }
        if let Some(url) = &proxy.https {
            let https = reqwest::Proxy::https(url)
                .map_err(|e| Error::config(format!("Invalid HTTPS proxy {url:?}: {e}")))?;
            builder = builder.proxy(https);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(
            "HTTP transport ready (timeout {:?}, proxy {})",
            config.request_timeout(),
            if proxy.is_empty() { "none" } else { "configured" }
        );

        Ok(Self { client, proxy })
    }

    /// Proxies in effect
    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_builder() {
        return Error::config(format!("Invalid request: {e}"));
    }
    if e.is_timeout() {
        return Error::transport(format!("Request timed out: {e}"));
    }
    if e.is_connect() {
        return Error::transport(format!("Connection failed: {e}"));
    }
    Error::transport(format!("HTTP request failed: {e}"))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response body: {e}")))?;

        Ok(HttpResponse::new(status, body))
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}
