//! Field extraction from response bodies.

use std::collections::BTreeMap;

use wekan_scan_catalog::EndpointSpec;

/// Apply every extraction rule of `spec` to a response body.
///
/// Returns the name of the first declared field with no match. Null values
/// count as missing.
pub fn extract_fields(
  spec: &EndpointSpec,
  body: &serde_json::Value,
) -> Result<BTreeMap<String, serde_json::Value>, String> {
  spec
    .extract
    .iter()
    .map(|(field, rule)| match rule.find(body) {
      Some(value) => Ok((field.clone(), value.clone())),
      None => Err(field.clone()),
    })
    .collect()
}
