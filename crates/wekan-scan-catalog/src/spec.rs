use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where a placeholder value comes from: a field extracted from a prior
/// endpoint's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
  /// Endpoint id that produced the value.
  pub from: String,
  /// Name of the extracted field on that endpoint's result.
  pub field: String,
}

/// How to pull a field out of a response body.
///
/// Either a single JSON Pointer or a list of pointers tried in order, for
/// endpoints that wrap the same object differently across server versions
/// (`{"board": {"_id": ..}}` vs. `{"_id": ..}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractRule {
  Pointer(String),
  FirstOf(Vec<String>),
}

impl ExtractRule {
  /// The pointers this rule tries, in order.
  pub fn pointers(&self) -> &[String] {
    match self {
      ExtractRule::Pointer(p) => std::slice::from_ref(p),
      ExtractRule::FirstOf(ps) => ps,
    }
  }

  /// Apply the rule to a response body, returning the first hit.
  pub fn find<'a>(&self, body: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
    self
      .pointers()
      .iter()
      .find_map(|p| body.pointer(p).filter(|v| !v.is_null()))
  }
}

impl From<&str> for ExtractRule {
  fn from(pointer: &str) -> Self {
    ExtractRule::Pointer(pointer.to_string())
  }
}

impl<const N: usize> From<[&str; N]> for ExtractRule {
  fn from(pointers: [&str; N]) -> Self {
    ExtractRule::FirstOf(pointers.iter().map(|p| p.to_string()).collect())
  }
}

fn default_expect() -> BTreeSet<u16> {
  BTreeSet::from([200])
}

fn default_category() -> String {
  "general".to_string()
}

/// One API call the scanner attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
  pub id: String,
  pub method: Method,
  /// Path template with `{placeholder}` segments.
  pub path: String,
  #[serde(default = "default_category")]
  pub category: String,
  /// Endpoints whose results must exist (and have succeeded) first.
  #[serde(default)]
  pub requires: Vec<String>,
  /// Placeholder name -> source field.
  #[serde(default)]
  pub bindings: BTreeMap<String, Binding>,
  /// Request payload; string leaves may be minijinja templates over the
  /// bound placeholders and `run_id`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<serde_json::Value>,
  /// Status codes counted as success.
  #[serde(default = "default_expect")]
  pub expect: BTreeSet<u16>,
  /// Field name -> extraction rule over the response body.
  #[serde(default)]
  pub extract: BTreeMap<String, ExtractRule>,
}

impl EndpointSpec {
  pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      method,
      path: path.into(),
      category: default_category(),
      requires: Vec::new(),
      bindings: BTreeMap::new(),
      body: None,
      expect: default_expect(),
      extract: BTreeMap::new(),
    }
  }

  pub fn category(mut self, category: impl Into<String>) -> Self {
    self.category = category.into();
    self
  }

  /// Add a dependency. Repeated ids are ignored.
  pub fn requires(mut self, id: impl Into<String>) -> Self {
    let id = id.into();
    if !self.requires.contains(&id) {
      self.requires.push(id);
    }
    self
  }

  /// Bind `placeholder` to `field` extracted by endpoint `from`.
  ///
  /// The source endpoint is added to `requires` as well, since a value can
  /// only be read from a result that exists.
  pub fn bind(mut self, placeholder: &str, from: &str, field: &str) -> Self {
    self.bindings.insert(
      placeholder.to_string(),
      Binding {
        from: from.to_string(),
        field: field.to_string(),
      },
    );
    self.requires(from)
  }

  pub fn body(mut self, body: serde_json::Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn expect(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
    self.expect = statuses.into_iter().collect();
    self
  }

  pub fn extract(mut self, field: &str, rule: impl Into<ExtractRule>) -> Self {
    self.extract.insert(field.to_string(), rule.into());
    self
  }

  /// Placeholder names in the path template, in order of appearance.
  pub fn placeholders(&self) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = self.path.as_str();
    while let Some(start) = rest.find('{') {
      let after = &rest[start + 1..];
      match after.find('}') {
        Some(end) => {
          names.push(&after[..end]);
          rest = &after[end + 1..];
        }
        None => break,
      }
    }
    names
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_placeholders_in_order() {
    let spec = EndpointSpec::new(
      "get-card",
      Method::Get,
      "/api/boards/{boardId}/lists/{listId}/cards/{cardId}",
    );
    assert_eq!(spec.placeholders(), vec!["boardId", "listId", "cardId"]);
  }

  #[test]
  fn test_bind_adds_requirement_once() {
    let spec = EndpointSpec::new("get-list", Method::Get, "/api/boards/{boardId}/lists/{listId}")
      .requires("create-board")
      .bind("boardId", "create-board", "boardId")
      .bind("listId", "create-list", "listId");

    assert_eq!(spec.requires, vec!["create-board", "create-list"]);
    assert_eq!(spec.bindings["listId"].from, "create-list");
  }

  #[test]
  fn test_extract_rule_first_hit_wins() {
    let rule = ExtractRule::from(["/board/_id", "/_id"]);

    assert_eq!(rule.find(&json!({ "_id": "b1" })), Some(&json!("b1")));
    assert_eq!(
      rule.find(&json!({ "board": { "_id": "b2" }, "_id": "x" })),
      Some(&json!("b2"))
    );
    assert_eq!(rule.find(&json!({ "board": null })), None);
  }

  #[test]
  fn test_deserialize_with_defaults() {
    let spec: EndpointSpec = serde_json::from_value(json!({
      "id": "create-list",
      "method": "POST",
      "path": "/api/boards/{boardId}/lists",
      "bindings": { "boardId": { "from": "create-board", "field": "boardId" } },
      "extract": { "listId": ["/_id", "/list/_id"] }
    }))
    .unwrap();

    assert_eq!(spec.method, Method::Post);
    assert_eq!(spec.category, "general");
    assert!(spec.requires.is_empty());
    assert_eq!(spec.expect, BTreeSet::from([200]));
    assert_eq!(spec.extract["listId"].pointers().len(), 2);
  }
}
