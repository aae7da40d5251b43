//! Test doubles and common utilities for contract tests
//!
//! `FakeCloudflare` is an in-memory stand-in for the provider's REST API.
//! It implements `HttpTransport`, so the real `CloudflareClient` and
//! `Session` run against it unchanged. State lives behind an `Arc<Mutex<..>>`
//! so a test can keep a handle while the client owns another.

#![allow(dead_code)]

use cfddns_core::config::{ClientConfig, Credentials, SessionConfig};
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use cfddns_core::types::{DnsRecord, RecordType, Zone};
use cfddns_core::{CloudflareClient, Session};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://api.test/client/v4";

/// One request as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub page: Option<u32>,
}

#[derive(Default)]
struct FakeState {
    zones: Vec<Zone>,
    records: BTreeMap<String, Vec<DnsRecord>>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    transport_failures: usize,
    status_failures: Vec<(Method, u16)>,
    omit_success_flag: bool,
}

/// In-memory provider API
pub struct FakeCloudflare {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloudflare {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                next_id: 1000,
                ..FakeState::default()
            })),
        }
    }

    /// Create a handle onto the same provider state
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
        }
    }

    pub fn with_zone(self, id: &str, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.zones.push(Zone {
                id: id.to_string(),
                name: name.to_string(),
            });
            state.records.entry(id.to_string()).or_default();
        }
        self
    }

    /// Seed a record with a fixed id
    pub fn with_record(
        self,
        zone_id: &str,
        id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let zone_name = state
                .zones
                .iter()
                .find(|zone| zone.id == zone_id)
                .map(|zone| zone.name.clone())
                .unwrap_or_default();
            state.records.entry(zone_id.to_string()).or_default().push(DnsRecord {
                id: id.to_string(),
                record_type,
                name: name.to_string(),
                content: content.to_string(),
                ttl,
                proxied,
                zone_name,
            });
        }
        self
    }

    /// Make the next `count` requests fail at the connection level
    pub fn fail_next_transport(&self, count: usize) {
        self.state.lock().unwrap().transport_failures = count;
    }

    /// Answer every request of a method with an error status
    pub fn fail_method_with_status(&self, method: Method, status: u16) {
        self.state.lock().unwrap().status_failures.push((method, status));
    }

    /// Drop the `success` field from every response
    pub fn omit_success_flag(&self) {
        self.state.lock().unwrap().omit_success_flag = true;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, method: Method) -> usize {
        self.calls().iter().filter(|call| call.method == method).count()
    }

    /// Number of create/update/delete requests
    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|call| call.method != Method::Get).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Records currently held for a zone
    pub fn records(&self, zone_id: &str) -> Vec<DnsRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, zone_id: &str, id: &str) -> Option<DnsRecord> {
        self.records(zone_id).into_iter().find(|record| record.id == id)
    }

    /// Change a record behind the client's back
    pub fn mutate_record(&self, zone_id: &str, id: &str, f: impl FnOnce(&mut DnsRecord)) {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|record| record.id == id))
        {
            f(record);
        }
    }
}

impl FakeState {
    fn handle(&mut self, request: &HttpRequest) -> HttpResponse {
        let path = request.url.trim_start_matches(BASE_URL).to_string();
        let page = request.query_param("page").and_then(|p| p.parse().ok());
        self.calls.push(RecordedCall {
            method: request.method,
            path: path.clone(),
            page,
        });

        if let Some((_, status)) = self
            .status_failures
            .iter()
            .find(|(method, _)| *method == request.method)
        {
            return error_response(*status, 1000, "injected failure");
        }

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["zones"]) => {
                let zones: Vec<Value> = self
                    .zones
                    .iter()
                    .map(|zone| json!({"id": zone.id, "name": zone.name, "status": "active"}))
                    .collect();
                paged(zones, request)
            }
            (Method::Get, ["zones", zone_id, "dns_records"]) => match self.records.get(*zone_id) {
                Some(records) => {
                    let items: Vec<Value> = records.iter().map(record_json).collect();
                    paged(items, request)
                }
                None => error_response(404, 1001, "zone not found"),
            },
            (Method::Post, ["zones", zone_id, "dns_records"]) => self.create(zone_id, request),
            (Method::Put, ["zones", zone_id, "dns_records", record_id]) => {
                self.update(zone_id, record_id, request)
            }
            (Method::Delete, ["zones", zone_id, "dns_records", record_id]) => {
                self.delete(zone_id, record_id)
            }
            _ => error_response(404, 7003, "no route"),
        };

        if self.omit_success_flag {
            if let Ok(mut body) = serde_json::from_str::<Value>(&response.body) {
                if let Some(object) = body.as_object_mut() {
                    object.remove("success");
                }
                return HttpResponse::new(response.status, body.to_string());
            }
        }
        response
    }

    fn create(&mut self, zone_id: &str, request: &HttpRequest) -> HttpResponse {
        let Some(zone_name) = self
            .zones
            .iter()
            .find(|zone| zone.id == zone_id)
            .map(|zone| zone.name.clone())
        else {
            return error_response(404, 1001, "zone not found");
        };
        let Some(body) = request.body.as_ref() else {
            return error_response(400, 9207, "missing body");
        };

        self.next_id += 1;
        let record = record_from_body(format!("rec-{}", self.next_id), body, &zone_name);
        self.records
            .entry(zone_id.to_string())
            .or_default()
            .push(record.clone());
        success(record_json(&record))
    }

    fn update(&mut self, zone_id: &str, record_id: &str, request: &HttpRequest) -> HttpResponse {
        let Some(body) = request.body.as_ref() else {
            return error_response(400, 9207, "missing body");
        };
        let Some(record) = self
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|record| record.id == record_id))
        else {
            return error_response(404, 81044, "record not found");
        };

        let zone_name = record.zone_name.clone();
        *record = record_from_body(record_id.to_string(), body, &zone_name);
        success(record_json(record))
    }

    fn delete(&mut self, zone_id: &str, record_id: &str) -> HttpResponse {
        let Some(records) = self.records.get_mut(zone_id) else {
            return error_response(404, 1001, "zone not found");
        };
        let before = records.len();
        records.retain(|record| record.id != record_id);
        if records.len() == before {
            return error_response(404, 81044, "record not found");
        }
        success(json!({"id": record_id}))
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeCloudflare {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            state.calls.push(RecordedCall {
                method: request.method,
                path: request.url.trim_start_matches(BASE_URL).to_string(),
                page: None,
            });
            return Err(Error::transport("connection reset by peer"));
        }
        Ok(state.handle(request))
    }

    fn transport_name(&self) -> &'static str {
        "fake"
    }
}

fn paged(items: Vec<Value>, request: &HttpRequest) -> HttpResponse {
    let page: usize = request
        .query_param("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let per_page: usize = request
        .query_param("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(20);

    let total = items.len();
    let chunk: Vec<Value> = items
        .into_iter()
        .skip((page.saturating_sub(1)) * per_page)
        .take(per_page)
        .collect();

    let body = json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": chunk,
        "result_info": {
            "page": page,
            "per_page": per_page,
            "count": chunk.len(),
            "total_count": total,
        }
    });
    HttpResponse::new(200, body.to_string())
}

fn success(result: Value) -> HttpResponse {
    let body = json!({"success": true, "errors": [], "messages": [], "result": result});
    HttpResponse::new(200, body.to_string())
}

fn error_response(status: u16, code: i64, message: &str) -> HttpResponse {
    let body = json!({
        "success": false,
        "errors": [{"code": code, "message": message}],
        "messages": [],
        "result": null
    });
    HttpResponse::new(status, body.to_string())
}

fn record_json(record: &DnsRecord) -> Value {
    json!({
        "id": record.id,
        "zone_name": record.zone_name,
        "name": record.name,
        "type": record.record_type.as_str(),
        "content": record.content,
        "ttl": record.ttl,
        "proxied": record.proxied,
    })
}

fn record_from_body(id: String, body: &Value, zone_name: &str) -> DnsRecord {
    DnsRecord {
        id,
        record_type: RecordType::from(body["type"].as_str().unwrap_or_default().to_string()),
        name: body["name"].as_str().unwrap_or_default().to_string(),
        content: body["content"].as_str().unwrap_or_default().to_string(),
        ttl: body["ttl"].as_u64().unwrap_or(1) as u32,
        proxied: body["proxied"].as_bool().unwrap_or(false),
        zone_name: zone_name.to_string(),
    }
}

/// Client config pointed at the fake
pub fn test_client_config() -> ClientConfig {
    ClientConfig {
        base_url: BASE_URL.to_string(),
        ..ClientConfig::default()
    }
}

/// Session config with no inter-call delay
pub fn test_session_config() -> SessionConfig {
    SessionConfig::default().with_inter_call_delay(Duration::ZERO)
}

pub fn test_client(fake: &FakeCloudflare) -> CloudflareClient {
    test_client_with(fake, test_client_config())
}

pub fn test_client_with(fake: &FakeCloudflare, config: ClientConfig) -> CloudflareClient {
    CloudflareClient::new(
        Box::new(FakeCloudflare::sharing_state_with(fake)),
        Credentials::api_key("me@example.com", "test-key"),
        &config,
    )
    .unwrap()
}

pub async fn test_session(fake: &FakeCloudflare) -> Session {
    Session::connect(test_client(fake), test_session_config())
        .await
        .unwrap()
}
