//! Input resolution for an endpoint about to run.
//!
//! Bindings are resolved first, into a flat map of placeholder -> value taken
//! from the `extracted` fields of required results. That map is then used
//! twice:
//!
//! - path placeholders are substituted as percent-encoded segments:
//!   `/api/boards/{boardId}/lists` -> `/api/boards/b1/lists`
//! - body string leaves are rendered as minijinja templates, with `run_id`
//!   available alongside the bindings:
//!   ```json
//!   { "boardId": "{{ boardId }}", "title": "scan {{ run_id }}" }
//!   ```
//!
//! A string that is exactly one `{{ expr }}` keeps the type of the value it
//! evaluates to, so numbers and booleans survive. Undefined variables are an
//! error rather than an empty string.

use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use wekan_scan_catalog::{CatalogError, EndpointSpec};

use crate::result::Outcome;
use crate::state::ScanState;

/// Resolve every binding of `spec` against the captured results.
pub fn resolve_bindings(
  spec: &EndpointSpec,
  state: &ScanState,
) -> Result<serde_json::Map<String, serde_json::Value>, CatalogError> {
  let mut resolved = serde_json::Map::new();

  for (placeholder, binding) in &spec.bindings {
    let unresolved = |message: String| CatalogError::UnresolvedBinding {
      id: spec.id.clone(),
      placeholder: placeholder.clone(),
      message,
    };

    if !spec.requires.contains(&binding.from) {
      return Err(unresolved(format!(
        "source '{}' is not listed in requires",
        binding.from
      )));
    }

    let source = state
      .get(&binding.from)
      .filter(|r| r.outcome == Outcome::Success)
      .ok_or_else(|| unresolved(format!("no successful result for '{}'", binding.from)))?;

    let value = source.extracted.get(&binding.field).ok_or_else(|| {
      unresolved(format!(
        "'{}' does not extract field '{}'",
        binding.from, binding.field
      ))
    })?;

    resolved.insert(placeholder.clone(), value.clone());
  }

  Ok(resolved)
}

/// Substitute `{placeholder}` segments in the endpoint's path.
///
/// Values are percent-encoded, so a `/`, `?` or `{` inside an id stays part
/// of its segment.
pub fn render_path(
  spec: &EndpointSpec,
  bindings: &serde_json::Map<String, serde_json::Value>,
) -> Result<String, CatalogError> {
  let mut path = spec.path.clone();
  for placeholder in spec.placeholders() {
    let value = bindings
      .get(placeholder)
      .ok_or_else(|| CatalogError::UnresolvedBinding {
        id: spec.id.clone(),
        placeholder: placeholder.to_string(),
        message: "path placeholder has no binding".to_string(),
      })?;
    let text = match value {
      serde_json::Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    path = path.replace(
      &format!("{{{}}}", placeholder),
      &urlencoding::encode(&text),
    );
  }
  Ok(path)
}

/// Render the endpoint's body template, if any.
pub fn render_body(
  spec: &EndpointSpec,
  bindings: &serde_json::Map<String, serde_json::Value>,
  run_id: &str,
) -> Result<Option<serde_json::Value>, CatalogError> {
  let Some(body) = &spec.body else {
    return Ok(None);
  };

  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);

  let mut context = bindings.clone();
  context.insert(
    "run_id".to_string(),
    serde_json::Value::String(run_id.to_string()),
  );
  let ctx_value = Value::from_serialize(&context);

  resolve_json_value(&env, &spec.id, body, &ctx_value).map(Some)
}

/// Recursively resolve templates in a JSON value.
fn resolve_json_value(
  env: &Environment,
  endpoint_id: &str,
  value: &serde_json::Value,
  context: &Value,
) -> Result<serde_json::Value, CatalogError> {
  match value {
    serde_json::Value::String(s) => {
      if let Some(expr) = pure_expression(s) {
        evaluate_expression(env, endpoint_id, expr, context)
      } else if s.contains("{{") || s.contains("{%") {
        env
          .render_str(s, context.clone())
          .map(serde_json::Value::String)
          .map_err(|e| template_error(endpoint_id, s, e))
      } else {
        Ok(value.clone())
      }
    }
    serde_json::Value::Array(arr) => {
      let resolved: Result<Vec<_>, _> = arr
        .iter()
        .map(|v| resolve_json_value(env, endpoint_id, v, context))
        .collect();
      Ok(serde_json::Value::Array(resolved?))
    }
    serde_json::Value::Object(obj) => {
      let mut resolved = serde_json::Map::new();
      for (k, v) in obj {
        resolved.insert(k.clone(), resolve_json_value(env, endpoint_id, v, context)?);
      }
      Ok(serde_json::Value::Object(resolved))
    }
    // Numbers, bools, nulls pass through unchanged
    _ => Ok(value.clone()),
  }
}

/// The inner expression of a string that is exactly `{{ expr }}`.
fn pure_expression(s: &str) -> Option<&str> {
  let trimmed = s.trim();
  let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
  if inner.contains("{{") || inner.contains("}}") {
    return None;
  }
  Some(inner.trim())
}

fn evaluate_expression(
  env: &Environment,
  endpoint_id: &str,
  expr: &str,
  context: &Value,
) -> Result<serde_json::Value, CatalogError> {
  let compiled = env
    .compile_expression(expr)
    .map_err(|e| invalid_template(endpoint_id, expr, e))?;
  let value = compiled
    .eval(context.clone())
    .map_err(|e| template_error(endpoint_id, expr, e))?;

  if value.is_undefined() {
    return Err(unbound_variable(endpoint_id, expr));
  }

  serde_json::to_value(&value).map_err(|e| invalid_template(endpoint_id, expr, e))
}

/// Undefined lookups become unresolved bindings, anything else is a broken template.
fn template_error(endpoint_id: &str, template: &str, e: minijinja::Error) -> CatalogError {
  if e.kind() == ErrorKind::UndefinedError {
    unbound_variable(endpoint_id, template)
  } else {
    invalid_template(endpoint_id, template, e)
  }
}

fn unbound_variable(endpoint_id: &str, template: &str) -> CatalogError {
  CatalogError::UnresolvedBinding {
    id: endpoint_id.to_string(),
    placeholder: template.to_string(),
    message: "body template references an unbound variable".to_string(),
  }
}

fn invalid_template(endpoint_id: &str, template: &str, e: impl std::fmt::Display) -> CatalogError {
  CatalogError::InvalidTemplate {
    id: endpoint_id.to_string(),
    message: format!("'{}': {}", template, e),
  }
}
