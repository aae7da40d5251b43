// # HTTP Transport Trait
//
// Defines the narrow interface the remote client uses to reach the provider.
//
// ## Implementations
//
// - reqwest: `cfddns-http` crate
// - In-memory fake provider: `tests/common` of this crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::traits::{HttpRequest, HttpTransport, Method};
//
// let response = transport
//     .execute(&HttpRequest::new(Method::Get, "https://api.cloudflare.com/client/v4/zones"))
//     .await?;
// println!("{} {}", response.status, response.body);
// ```

use async_trait::async_trait;
use std::fmt;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-described outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Request headers, including authentication
    pub headers: Vec<(String, String)>,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Optional JSON body
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Create a request with no headers, query or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append headers
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set the JSON body
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transport implementations
///
/// # Trust Level: Untrusted
///
/// A transport only moves bytes. Interpretation of the response belongs to
/// `CloudflareClient`.
///
/// ## Allowed Capabilities
/// - ✅ Perform one HTTP(S) exchange per call
/// - ✅ Apply the configured timeout and proxies
/// - ✅ Return any HTTP status as a response, 4xx and 5xx included
///
/// ## Forbidden Capabilities
/// - ❌ Retry (owned by `CloudflareClient`)
/// - ❌ Decide whether a status means success (owned by `CloudflareClient`)
/// - ❌ Log credential headers
///
/// ## Failure Contract
///
/// Return `Error::Transport` only for connection-level failures: timeouts,
/// refused or reset connections, unreadable bodies. These are the failures
/// the client retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one request
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, crate::Error>;

    /// Transport name (for logging)
    fn transport_name(&self) -> &'static str;
}
