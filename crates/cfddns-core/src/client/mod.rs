//! Remote client for the provider's zone and record API
//!
//! `CloudflareClient` turns the typed operations used by the reconciliation
//! session into [`HttpRequest`]s, sends them through an [`HttpTransport`],
//! and classifies the outcome:
//!
//! - connection-level failures are retried up to `max_attempts` times, with no
//!   delay beyond the transport's own timeout, then surfaced as
//!   `Error::Transport`
//! - a non-2xx status, an unparseable body, or an envelope whose `success`
//!   flag is missing or false is an `Error::Application` and is never retried
//!
//! ## API Calls
//!
//! ```http
//! GET    /zones?page=N&per_page=M
//! GET    /zones/:zone_id/dns_records?page=N&per_page=M
//! POST   /zones/:zone_id/dns_records
//! PUT    /zones/:zone_id/dns_records/:record_id
//! DELETE /zones/:zone_id/dns_records/:record_id
//! ```

use crate::config::{ClientConfig, Credentials};
use crate::error::{Error, Result};
use crate::payload::RecordPayload;
use crate::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::types::{ApiEnvelope, DnsRecord, ResultInfo, Zone};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, warn};

/// Longest body excerpt carried into an error message
const MAX_ERROR_BODY: usize = 256;

/// Client for the provider's REST API
pub struct CloudflareClient {
    /// Transport used for every call
    transport: Box<dyn HttpTransport>,

    /// API credentials
    /// ⚠️ NEVER log these
    credentials: Credentials,

    /// API base URL without trailing slash
    base_url: String,

    /// Attempts per call for connection-level failures
    max_attempts: u32,

    /// Page size for list calls
    per_page: u32,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("transport", &self.transport.transport_name())
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a new client
    ///
    /// Fails with `Error::Config` when the credentials or configuration are
    /// invalid.
    pub fn new(
        transport: Box<dyn HttpTransport>,
        credentials: Credentials,
        config: &ClientConfig,
    ) -> Result<Self> {
        credentials.validate()?;
        config.validate()?;

        Ok(Self {
            transport,
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts,
            per_page: config.per_page,
        })
    }

    /// Page size used by list calls
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch one page of zones
    pub async fn list_zones(&self, page: u32) -> Result<(Vec<Zone>, ResultInfo)> {
        let request = self.list_request(format!("{}/zones", self.base_url), page);
        let envelope: ApiEnvelope<Vec<Zone>> = self.call(request).await?;
        Self::page_of(envelope, "zones")
    }

    /// Fetch one page of records of a zone
    pub async fn list_records(&self, zone_id: &str, page: u32) -> Result<(Vec<DnsRecord>, ResultInfo)> {
        let request = self.list_request(self.records_url(zone_id), page);
        let envelope: ApiEnvelope<Vec<DnsRecord>> = self.call(request).await?;
        Self::page_of(envelope, "dns records")
    }

    /// Fetch every zone, following pagination to the end
    pub async fn list_all_zones(&self) -> Result<Vec<Zone>> {
        collect_pages("zones", |page| self.list_zones(page)).await
    }

    /// Fetch every record of a zone, following pagination to the end
    pub async fn list_all_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        collect_pages("dns records", |page| self.list_records(zone_id, page)).await
    }

    /// Create a record
    pub async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<DnsRecord> {
        let request = self
            .request(Method::Post, self.records_url(zone_id))
            .with_body(serde_json::to_value(payload)?);
        let envelope: ApiEnvelope<DnsRecord> = self.call(request).await?;
        Self::single(envelope, "create")
    }

    /// Replace a record's type, name, content, ttl and proxied flag
    pub async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord> {
        let request = self
            .request(Method::Put, self.record_url(zone_id, record_id))
            .with_body(serde_json::to_value(payload)?);
        let envelope: ApiEnvelope<DnsRecord> = self.call(request).await?;
        Self::single(envelope, "update")
    }

    /// Delete a record
    pub async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let request = self.request(Method::Delete, self.record_url(zone_id, record_id));
        let _: ApiEnvelope<serde_json::Value> = self.call(request).await?;
        Ok(())
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id)
    }

    fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .with_headers(self.credentials.headers())
            .with_headers(vec![(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )])
    }

    fn list_request(&self, url: String, page: u32) -> HttpRequest {
        self.request(Method::Get, url)
            .with_query("page", page)
            .with_query("per_page", self.per_page)
    }

    /// Send a request and unwrap the provider envelope
    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<ApiEnvelope<T>> {
        debug!("{} {}", request.method, request.url);
        let response = self.send_with_retry(&request).await?;
        debug!("Response Status: {}", response.status);

        if !response.is_success() {
            return Err(Self::status_error(&response));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&response.body).map_err(|e| {
            Error::application(
                Some(response.status),
                format!("Failed to parse response: {e}"),
            )
        })?;

        if !envelope.success {
            let message = envelope
                .error_summary()
                .unwrap_or_else(|| "response carries no success flag".to_string());
            return Err(Error::application(Some(response.status), message));
        }

        Ok(envelope)
    }

    /// Execute with the retry budget for connection-level failures
    async fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.transport.execute(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        request.method, request.url, attempt, self.max_attempts, e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::transport("no attempt was made")))
    }

    /// Map a non-2xx response to an application error
    fn status_error(response: &HttpResponse) -> Error {
        let detail = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&response.body)
            .ok()
            .and_then(|envelope| envelope.error_summary())
            .unwrap_or_else(|| excerpt(&response.body));

        let message = match response.status {
            401 | 403 => format!(
                "Authentication failed: invalid credentials or insufficient permissions - {detail}"
            ),
            404 => format!("Not found - {detail}"),
            429 => format!("Rate limit exceeded - {detail}"),
            500..=599 => format!("Provider server error - {detail}"),
            _ => detail,
        };

        Error::application(Some(response.status), message)
    }

    fn page_of<T>(envelope: ApiEnvelope<Vec<T>>, what: &str) -> Result<(Vec<T>, ResultInfo)> {
        let info = envelope.result_info.ok_or_else(|| {
            Error::application(None, format!("Listing {what} returned no result_info"))
        })?;
        Ok((envelope.result.unwrap_or_default(), info))
    }

    fn single(envelope: ApiEnvelope<DnsRecord>, action: &str) -> Result<DnsRecord> {
        envelope.result.ok_or_else(|| {
            Error::application(None, format!("Record {action} returned no result"))
        })
    }
}

/// Drive a paged listing to completion
///
/// Pages are requested from 1 upward until the number of items received
/// reaches the reported `total_count`. An empty page before that point ends
/// the listing with a warning.
async fn collect_pages<T, F, Fut>(what: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, ResultInfo)>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let (batch, info) = fetch(page).await?;
        let received = batch.len();
        items.extend(batch);

        debug!(
            "Fetched page {} of {}: {} item(s), {}/{} total",
            page,
            what,
            received,
            items.len(),
            info.total_count
        );

        if items.len() >= info.total_count as usize {
            break;
        }
        if received == 0 {
            warn!(
                "Listing {} stopped at page {} with {}/{} item(s): provider returned an empty page",
                what,
                page,
                items.len(),
                info.total_count
            );
            break;
        }
        page += 1;
    }

    Ok(items)
}

fn excerpt(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
