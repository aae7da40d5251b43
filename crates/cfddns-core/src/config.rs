//! Configuration types for the cfddns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API v4 base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TTL value the provider interprets as "automatic"
pub const AUTOMATIC_TTL: u32 = 1;

/// Smallest explicit TTL the provider accepts
pub const MIN_TTL: u32 = 60;

/// API credentials
///
/// The Debug implementation never exposes the secret.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Global API key, sent as `X-Auth-Email` / `X-Auth-Key`
    ApiKey {
        /// Account email
        email: String,
        /// Global API key
        key: String,
    },

    /// Scoped API token, sent as a bearer token
    ApiToken {
        /// API token
        token: String,
    },
}

impl Credentials {
    /// Create global API key credentials
    pub fn api_key(email: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKey {
            email: email.into(),
            key: key.into(),
        }
    }

    /// Create API token credentials
    pub fn api_token(token: impl Into<String>) -> Self {
        Self::ApiToken {
            token: token.into(),
        }
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Credentials::ApiKey { email, key } => {
                if email.trim().is_empty() {
                    return Err(crate::Error::config("No email provided"));
                }
                if key.trim().is_empty() {
                    return Err(crate::Error::config("No API key provided"));
                }
                Ok(())
            }
            Credentials::ApiToken { token } => {
                if token.trim().is_empty() {
                    return Err(crate::Error::config("No API token provided"));
                }
                Ok(())
            }
        }
    }

    /// Authentication headers for a request
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            Credentials::ApiKey { email, key } => vec![
                ("X-Auth-Email".to_string(), email.clone()),
                ("X-Auth-Key".to_string(), key.clone()),
            ],
            Credentials::ApiToken { token } => {
                vec![("Authorization".to_string(), format!("Bearer {token}"))]
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
            Credentials::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Outbound proxy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy for plain HTTP requests
    #[serde(default)]
    pub http: Option<String>,

    /// Proxy for HTTPS requests
    #[serde(default)]
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Create a proxy configuration, treating empty strings as absent
    pub fn new(http: Option<String>, https: Option<String>) -> Self {
        Self {
            http: http.filter(|p| !p.trim().is_empty()),
            https: https.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Fill a missing side from the other one
    ///
    /// If only one proxy is given it is used for both schemes.
    pub fn normalized(&self) -> Self {
        let cleaned = Self::new(self.http.clone(), self.https.clone());
        Self {
            http: cleaned.http.clone().or_else(|| cleaned.https.clone()),
            https: cleaned.https.or(cleaned.http),
        }
    }

    /// Whether any proxy is configured
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

/// Remote client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per call before a transport failure is surfaced
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Page size for zone and record listings
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Outbound proxies
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl ClientConfig {
    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.trim().is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be >= 1"));
        }
        if self.per_page == 0 {
            return Err(crate::Error::config("per_page must be > 0"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            per_page: default_per_page(),
            proxy: ProxyConfig::default(),
        }
    }
}

/// Reconciliation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// TTL used when a target entry does not carry one
    ///
    /// Must be [`AUTOMATIC_TTL`] or at least [`MIN_TTL`].
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Proxied flag used when a target entry does not set it
    #[serde(default)]
    pub default_proxied: bool,

    /// Pause after every create/update/delete call (in milliseconds)
    ///
    /// Keeps bursts under the provider's rate limit. Set to 0 in tests.
    #[serde(default = "default_inter_call_delay_ms")]
    pub inter_call_delay_ms: u64,
}

impl SessionConfig {
    /// Pause after every mutating call
    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }

    /// Set the default TTL
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the default proxied flag
    pub fn with_default_proxied(mut self, proxied: bool) -> Self {
        self.default_proxied = proxied;
        self
    }

    /// Set the inter-call delay
    pub fn with_inter_call_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Validate the session configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_ttl != AUTOMATIC_TTL && self.default_ttl < MIN_TTL {
            return Err(crate::Error::config(format!(
                "Default TTL must be {AUTOMATIC_TTL} (automatic) or >= {MIN_TTL}. Got: {}",
                self.default_ttl
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            default_proxied: false,
            inter_call_delay_ms: default_inter_call_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    CLOUDFLARE_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_per_page() -> u32 {
    200
}

fn default_ttl() -> u32 {
    300
}

fn default_inter_call_delay_ms() -> u64 {
    100
}
