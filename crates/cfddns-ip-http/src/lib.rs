// # HTTP Public IP Discovery
//
// This crate finds the host's public address by asking plain-text
// "what is my IP" services, one after another, until one answers with an
// address of the requested family.
//
// ## Architecture
//
// Requests go through an `HttpTransport`, so discovery uses the same
// timeout and proxy settings as the provider API calls. Each service is
// tried once; a failing or unhelpful service just moves on to the next.

use cfddns_core::traits::{HttpRequest, HttpTransport, Method};
use cfddns_core::{Error, Result};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// Default IP services, tried in order
///
/// The first entries answer over IPv6 when the host has it; the last one is
/// IPv4-only.
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api64.ipify.org/",
    "https://ip.seeip.org",
    "http://api.ip.sb/ip",
    "https://api.ipify.org",
];

/// Address family to discover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IpVersion::V4 => "IPv4",
            IpVersion::V6 => "IPv6",
        })
    }
}

/// Parse a service's answer and check its family
pub fn parse_ip_for_version(body: &str, version: IpVersion) -> Result<IpAddr> {
    let text = body.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::validation(format!("Invalid IP address: {text:?}")))?;

    if !version.matches(&ip) {
        return Err(Error::validation(format!("Expected {version}, got: {ip}")));
    }
    Ok(ip)
}

/// Public IP finder over a list of services
pub struct PublicIpFinder {
    transport: Box<dyn HttpTransport>,
    urls: Vec<String>,
}

impl fmt::Debug for PublicIpFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicIpFinder")
            .field("transport", &self.transport.transport_name())
            .field("urls", &self.urls)
            .finish()
    }
}

impl PublicIpFinder {
    /// Create a finder over the default services
    pub fn new(transport: Box<dyn HttpTransport>) -> Self {
        Self::with_urls(transport, DEFAULT_IP_SERVICES.iter().map(|url| url.to_string()))
    }

    /// Create a finder over custom services
    pub fn with_urls(transport: Box<dyn HttpTransport>, urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            transport,
            urls: urls.into_iter().collect(),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Ask each service in turn for an address of the given family
    ///
    /// Returns `Error::Transport` when no service produced one.
    pub async fn detect(&self, version: IpVersion) -> Result<IpAddr> {
        for url in &self.urls {
            let response = match self.transport.execute(&HttpRequest::new(Method::Get, url)).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("IP service {} failed: {}", url, e);
                    continue;
                }
            };

            if !response.is_success() {
                warn!("IP service {} answered HTTP {}", url, response.status);
                continue;
            }

            match parse_ip_for_version(&response.body, version) {
                Ok(ip) => {
                    info!("Detected public {} address {} via {}", version, ip, url);
                    return Ok(ip);
                }
                Err(e) => debug!("IP service {} gave no usable {} answer: {}", url, version, e),
            }
        }

        Err(Error::transport(format!(
            "no public {version} address found via {} service(s)",
            self.urls.len()
        )))
    }
}
