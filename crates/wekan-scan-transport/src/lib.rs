//! wekan-scan Transport
//!
//! The scanner only needs one thing from HTTP: send a request, get back a
//! status, headers and a body, or an error. [`Transport`] is that capability;
//! [`HttpTransport`] is the `reqwest` implementation used by the CLI.
//! TLS, pooling and timeouts live here and nowhere else.

mod error;
mod http;
mod types;

use async_trait::async_trait;

pub use error::TransportError;
pub use http::{HttpTransport, TransportConfig};
pub use types::{Request, Response};

/// Capability to perform one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Send a request. Any response, whatever its status, is `Ok`.
  async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}
