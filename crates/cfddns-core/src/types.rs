//! Provider wire types and the composite record key
//!
//! These mirror the provider's documented JSON schema: zone objects, record
//! objects, and the `{success, result, result_info, errors}` envelope wrapping
//! every response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS record type
///
/// Only `A`, `AAAA` and `CNAME` are managed. Other types appear in listings
/// and are carried through the cache untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// CNAME record (alias)
    Cname,
    /// Any unmanaged type, upper-cased
    Other(String),
}

impl RecordType {
    /// The provider's spelling of this type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Other(other) => other,
        }
    }

    /// Whether this type is one of the managed types
    pub fn is_managed(&self) -> bool {
        !matches!(self, RecordType::Other(_))
    }

    /// Parse a managed type, rejecting everything else
    pub fn parse_managed(value: &str) -> crate::Result<Self> {
        let parsed = RecordType::from(value.to_string());
        if parsed.is_managed() {
            Ok(parsed)
        } else {
            Err(crate::Error::validation(format!(
                "invalid dns type {value:?} (expected A, AAAA or CNAME)"
            )))
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        let upper = value.trim().to_ascii_uppercase();
        match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            _ => RecordType::Other(upper),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::parse_managed(s)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zone as returned by the zone listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Opaque zone identifier
    pub id: String,
    /// Registrable domain, e.g. "example.com"
    pub name: String,
}

/// A DNS record as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Opaque record identifier, stable across updates
    pub id: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Fully-qualified name
    pub name: String,

    /// Address or target
    pub content: String,

    /// TTL in seconds, or 1 for automatic
    pub ttl: u32,

    /// Whether traffic goes through the provider's edge
    #[serde(default)]
    pub proxied: bool,

    /// Owning zone name
    #[serde(default)]
    pub zone_name: String,
}

impl DnsRecord {
    /// The composite key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, self.record_type.clone(), &self.content)
    }
}

/// Composite `(name, type, content)` key
///
/// Ordering is by name, then type, then content, so every record of one
/// `(name, type)` pair sits in a contiguous range of an ordered map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    /// Fully-qualified name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record content
    pub content: String,
}

impl RecordKey {
    /// Create a new key
    pub fn new(name: impl Into<String>, record_type: RecordType, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type,
            content: content.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.name, self.record_type, self.content)
    }
}

/// Pagination block of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Page number
    #[serde(default)]
    pub page: u32,
    /// Requested page size
    #[serde(default)]
    pub per_page: u32,
    /// Items on this page
    pub count: u32,
    /// Items across all pages
    pub total_count: u32,
}

/// Error or message entry of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Provider error code
    #[serde(default)]
    pub code: i64,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Success indicator; absent counts as failure
    #[serde(default)]
    pub success: bool,

    /// Payload
    pub result: Option<T>,

    /// Pagination block (list endpoints only)
    #[serde(default)]
    pub result_info: Option<ResultInfo>,

    /// Errors reported by the provider
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

impl<T> ApiEnvelope<T> {
    /// Joined provider error messages, if any
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
