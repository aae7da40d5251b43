// # cfddns-core
//
// Core library for reconciling DNS records against the provider's API.
//
// ## Architecture Overview
//
// - **HttpTransport**: Trait for moving one HTTP request to the provider
// - **CloudflareClient**: Authenticated API calls with retry and pagination
// - **ZoneResolver**: Longest-suffix mapping of domains to zones
// - **RecordCache**: Per-session mirror of zones and records, two coupled views
// - **build_payload**: Desired record → create/update body (ttl/proxied rules)
// - **Session**: Diffs a `TargetState` against the cache and applies the changes
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The engine never touches sockets; transports never interpret responses
// 2. **Instance-Owned State**: Every session builds its own cache; nothing is process-wide
// 3. **Fail Loud on Drift**: A cache that disagrees with a mutation stops the pass
// 4. **Library-First**: The binary is a thin layer over this crate
// 5. **Idempotency**: Re-running a pass against unchanged remote state makes no calls

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod payload;
pub mod resolver;
pub mod target;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use cache::RecordCache;
pub use client::CloudflareClient;
pub use config::{ClientConfig, Credentials, ProxyConfig, SessionConfig};
pub use engine::{Action, ReconcileReport, Session, SkipReason};
pub use error::{Error, Result};
pub use payload::{RecordPayload, build_payload};
pub use resolver::ZoneResolver;
pub use target::{RawRecord, RecordSpec, TargetState};
pub use traits::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use types::{DnsRecord, RecordKey, RecordType, Zone};
