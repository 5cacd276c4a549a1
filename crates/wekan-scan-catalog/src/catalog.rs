use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::graph::Graph;
use crate::spec::EndpointSpec;

/// Serializable catalog definition, as read from a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDef {
  pub endpoints: Vec<EndpointSpec>,
}

/// A validated endpoint catalog, held in dependency order.
///
/// Built once and immutable afterwards. Every endpoint appears after all the
/// endpoints it requires; independent endpoints keep declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
  specs: Vec<EndpointSpec>,
  index: HashMap<String, usize>,
}

impl Catalog {
  /// Validate and order a list of endpoint specs.
  pub fn new(specs: Vec<EndpointSpec>) -> Result<Self, CatalogError> {
    let order = Graph::new(&specs)?.topological_order(&specs)?;

    let mut slots: Vec<Option<EndpointSpec>> = specs.into_iter().map(Some).collect();
    let specs: Vec<EndpointSpec> = order
      .into_iter()
      .filter_map(|i| slots[i].take())
      .collect();

    let index = specs
      .iter()
      .enumerate()
      .map(|(i, s)| (s.id.clone(), i))
      .collect();

    Ok(Self { specs, index })
  }

  /// Parse a catalog definition from JSON and validate it.
  pub fn from_json(json: &str) -> Result<Self, CatalogError> {
    let def: CatalogDef = serde_json::from_str(json)?;
    Self::new(def.endpoints)
  }

  /// Read and validate a JSON catalog file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json(&json)
  }

  /// All specs, in dependency-satisfied order.
  pub fn specs(&self) -> &[EndpointSpec] {
    &self.specs
  }

  pub fn get(&self, id: &str) -> Option<&EndpointSpec> {
    self.index.get(id).map(|&i| &self.specs[i])
  }

  /// Endpoint ids in scan order.
  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.specs.iter().map(|s| s.id.as_str())
  }

  pub fn len(&self) -> usize {
    self.specs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.specs.is_empty()
  }

  /// Export the ordered catalog as a serializable definition.
  pub fn to_def(&self) -> CatalogDef {
    CatalogDef {
      endpoints: self.specs.clone(),
    }
  }
}
