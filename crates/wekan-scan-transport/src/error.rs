use thiserror::Error;

/// Failure to complete an HTTP exchange.
///
/// A scan records these as a failed endpoint; they never abort the run.
#[derive(Debug, Error)]
pub enum TransportError {
  /// The configured base URL cannot be parsed or joined.
  #[error("invalid base url '{url}': {message}")]
  InvalidBaseUrl { url: String, message: String },

  /// The token cannot be sent as an `Authorization` header.
  #[error("invalid api token: {message}")]
  InvalidToken { message: String },

  /// The HTTP client could not be built.
  #[error("failed to build http client: {0}")]
  Client(#[source] reqwest::Error),

  /// The request did not complete within the configured timeout.
  #[error("request timed out: {method} {path}")]
  Timeout { method: String, path: String },

  /// Connection refused, DNS failure, TLS failure, etc.
  #[error("request failed: {method} {path}: {source}")]
  Request {
    method: String,
    path: String,
    #[source]
    source: reqwest::Error,
  },

  /// The response arrived but its body could not be read.
  #[error("malformed response for {method} {path}: {message}")]
  MalformedResponse {
    method: String,
    path: String,
    message: String,
  },
}
