use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method as HttpMethod};
use tracing::debug;
use url::Url;
use wekan_scan_catalog::Method;

use crate::Transport;
use crate::error::TransportError;
use crate::types::{Request, Response};

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
  /// Base URL of the server, e.g. `http://localhost:8080`.
  pub base_url: String,
  /// Bearer token sent with every request.
  pub token: Option<String>,
  pub timeout: Duration,
  pub verify_tls: bool,
}

impl TransportConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      token: None,
      timeout: Duration::from_secs(30),
      verify_tls: true,
    }
  }
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
    let base_url = parse_base_url(&config.base_url)?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = &config.token {
      let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
        TransportError::InvalidToken {
          message: e.to_string(),
        }
      })?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
      .default_headers(headers)
      .timeout(config.timeout)
      .danger_accept_invalid_certs(!config.verify_tls)
      .build()
      .map_err(TransportError::Client)?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Join a request path onto the base URL, keeping any base path prefix
  /// (`http://host/wekan` + `/api/boards` -> `http://host/wekan/api/boards`).
  pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| TransportError::InvalidBaseUrl {
        url: self.base_url.to_string(),
        message: format!("cannot join path '{}': {}", path, e),
      })
  }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportError> {
  let mut url = Url::parse(raw).map_err(|e| TransportError::InvalidBaseUrl {
    url: raw.to_string(),
    message: e.to_string(),
  })?;

  if url.cannot_be_a_base() {
    return Err(TransportError::InvalidBaseUrl {
      url: raw.to_string(),
      message: "url cannot be used as a base".to_string(),
    });
  }

  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }

  Ok(url)
}

fn to_http_method(method: Method) -> HttpMethod {
  match method {
    Method::Get => HttpMethod::GET,
    Method::Post => HttpMethod::POST,
    Method::Put => HttpMethod::PUT,
    Method::Delete => HttpMethod::DELETE,
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: &Request) -> Result<Response, TransportError> {
    let url = self.url_for(&request.path)?;
    debug!(method = %request.method, url = %url, "http_request");

    let mut builder = self
      .client
      .request(to_http_method(request.method), url);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| {
      if e.is_timeout() {
        TransportError::Timeout {
          method: request.method.to_string(),
          path: request.path.clone(),
        }
      } else {
        TransportError::Request {
          method: request.method.to_string(),
          path: request.path.clone(),
          source: e,
        }
      }
    })?;

    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(k, v)| {
        v.to_str()
          .ok()
          .map(|val| (k.as_str().to_string(), val.to_string()))
      })
      .collect();

    let text = response
      .text()
      .await
      .map_err(|e| TransportError::MalformedResponse {
        method: request.method.to_string(),
        path: request.path.clone(),
        message: e.to_string(),
      })?;

    debug!(status, bytes = text.len(), "http_response");

    Ok(Response {
      status,
      headers,
      body: Response::parse_body(text),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_for_keeps_base_path() {
    let transport = HttpTransport::new(TransportConfig::new("http://localhost:8080/wekan")).unwrap();
    assert_eq!(
      transport.url_for("/api/boards").unwrap().as_str(),
      "http://localhost:8080/wekan/api/boards"
    );
  }

  #[test]
  fn test_url_for_root_base() {
    let transport = HttpTransport::new(TransportConfig::new("http://localhost:8080")).unwrap();
    assert_eq!(
      transport.url_for("api/boards/b1/lists").unwrap().as_str(),
      "http://localhost:8080/api/boards/b1/lists"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let err = HttpTransport::new(TransportConfig::new("not a url")).unwrap_err();
    assert!(matches!(err, TransportError::InvalidBaseUrl { .. }));
  }

  #[test]
  fn test_invalid_token_rejected() {
    let mut config = TransportConfig::new("http://localhost:8080");
    config.token = Some("bad\ntoken".to_string());
    assert!(matches!(
      HttpTransport::new(config),
      Err(TransportError::InvalidToken { .. })
    ));
  }
}
