//! Core traits for the cfddns system
//!
//! - [`HttpTransport`]: Move one HTTP request to the provider and back

pub mod http_transport;

pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, Method};
