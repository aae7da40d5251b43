//! Create/update request bodies
//!
//! Rules:
//! - an explicit ttl other than the automatic sentinel wins over the
//!   session default
//! - `proxied = Some(true)` forces the automatic ttl; anything else falls
//!   back to the session's default proxied flag

use crate::config::{AUTOMATIC_TTL, SessionConfig};
use crate::types::{DnsRecord, RecordType};
use serde::{Deserialize, Serialize};

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
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
    pub proxied: bool,
}

impl RecordPayload {
    /// Whether an existing record already carries this payload's values
    pub fn matches(&self, record: &DnsRecord) -> bool {
        record.record_type == self.record_type
            && record.name == self.name
            && record.content == self.content
            && record.ttl == self.ttl
            && record.proxied == self.proxied
    }
}

/// Build the body for one desired record
pub fn build_payload(
    name: &str,
    record_type: RecordType,
    content: &str,
    ttl: Option<u32>,
    proxied: Option<bool>,
    session: &SessionConfig,
) -> RecordPayload {
    let mut ttl = match ttl {
        Some(ttl) if ttl != AUTOMATIC_TTL => ttl,
        _ => session.default_ttl,
    };

    let proxied = match proxied {
        Some(true) => true,
        _ => session.default_proxied,
    };
    if proxied {
        ttl = AUTOMATIC_TTL;
    }

    RecordPayload {
        record_type,
        name: name.to_string(),
        content: content.to_string(),
        ttl,
        proxied,
    }
}
