use std::collections::{BTreeSet, HashMap};

use crate::error::CatalogError;
use crate::spec::EndpointSpec;

/// Dependency graph over a list of endpoint specs, by declaration index.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: index -> indices of dependents.
  adjacency: Vec<Vec<usize>>,
  /// Number of unsatisfied dependencies per index.
  in_degree: Vec<usize>,
}

impl Graph {
  /// Build a graph, checking that ids are unique and every reference is known.
  pub fn new(specs: &[EndpointSpec]) -> Result<Self, CatalogError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
      if index.insert(spec.id.as_str(), i).is_some() {
        return Err(CatalogError::DuplicateId {
          id: spec.id.clone(),
        });
      }
    }

    let mut adjacency = vec![Vec::new(); specs.len()];
    let mut in_degree = vec![0; specs.len()];

    for (i, spec) in specs.iter().enumerate() {
      for dependency in &spec.requires {
        let &from = index
          .get(dependency.as_str())
          .ok_or_else(|| CatalogError::UnknownDependency {
            id: spec.id.clone(),
            dependency: dependency.clone(),
          })?;
        adjacency[from].push(i);
        in_degree[i] += 1;
      }

      for (placeholder, binding) in &spec.bindings {
        if !index.contains_key(binding.from.as_str()) {
          return Err(CatalogError::UnknownBindingSource {
            id: spec.id.clone(),
            placeholder: placeholder.clone(),
            source_id: binding.from.clone(),
          });
        }
      }
    }

    Ok(Self {
      adjacency,
      in_degree,
    })
  }

  /// Kahn's algorithm, always taking the lowest ready index so that
  /// independent endpoints keep their declaration order.
  pub fn topological_order(&self, specs: &[EndpointSpec]) -> Result<Vec<usize>, CatalogError> {
    let mut in_degree = self.in_degree.clone();
    let mut ready: BTreeSet<usize> = in_degree
      .iter()
      .enumerate()
      .filter(|(_, d)| **d == 0)
      .map(|(i, _)| i)
      .collect();

    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(i) = ready.pop_first() {
      order.push(i);
      for &dependent in &self.adjacency[i] {
        in_degree[dependent] -= 1;
        if in_degree[dependent] == 0 {
          ready.insert(dependent);
        }
      }
    }

    if order.len() < specs.len() {
      let ids = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > 0)
        .map(|(i, _)| specs[i].id.clone())
        .collect();
      return Err(CatalogError::CycleDetected { ids });
    }

    Ok(order)
  }
}

/// Check that a set of specs forms a valid catalog.
///
/// Fails when an id is duplicated, when `requires` or a binding names an
/// unknown id, or when the `requires` graph has a cycle.
pub fn validate(specs: &[EndpointSpec]) -> Result<(), CatalogError> {
  Graph::new(specs)?.topological_order(specs).map(|_| ())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::spec::Method;

  fn spec(id: &str, requires: &[&str]) -> EndpointSpec {
    requires
      .iter()
      .fold(EndpointSpec::new(id, Method::Get, "/"), |s, r| s.requires(*r))
  }

  fn ordered_ids(specs: &[EndpointSpec]) -> Vec<String> {
    let graph = Graph::new(specs).unwrap();
    graph
      .topological_order(specs)
      .unwrap()
      .into_iter()
      .map(|i| specs[i].id.clone())
      .collect()
  }

  #[test]
  fn test_declaration_order_breaks_ties() {
    let specs = vec![spec("a", &[]), spec("b", &[]), spec("c", &[])];
    assert_eq!(ordered_ids(&specs), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_dependencies_come_first() {
    let specs = vec![
      spec("create-card", &["create-list"]),
      spec("list-boards", &[]),
      spec("create-list", &["create-board"]),
      spec("create-board", &[]),
    ];
    assert_eq!(
      ordered_ids(&specs),
      vec!["list-boards", "create-board", "create-list", "create-card"]
    );
  }

  #[test]
  fn test_dependent_keeps_position_relative_to_later_roots() {
    let specs = vec![
      spec("a", &[]),
      spec("b", &["a"]),
      spec("c", &[]),
    ];
    assert_eq!(ordered_ids(&specs), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_cycle_detected() {
    let specs = vec![spec("root", &[]), spec("a", &["b"]), spec("b", &["a"])];
    let err = validate(&specs).unwrap_err();
    match err {
      CatalogError::CycleDetected { ids } => assert_eq!(ids, vec!["a", "b"]),
      other => panic!("expected CycleDetected, got {other:?}"),
    }
  }

  #[test]
  fn test_self_dependency_is_a_cycle() {
    let specs = vec![spec("a", &["a"])];
    assert!(matches!(
      validate(&specs),
      Err(CatalogError::CycleDetected { .. })
    ));
  }

  #[test]
  fn test_unknown_dependency() {
    let specs = vec![spec("a", &["missing"])];
    assert!(matches!(
      validate(&specs),
      Err(CatalogError::UnknownDependency { ref dependency, .. }) if dependency == "missing"
    ));
  }

  #[test]
  fn test_unknown_binding_source() {
    let mut s = spec("a", &[]);
    s.bindings.insert(
      "boardId".to_string(),
      crate::spec::Binding {
        from: "nowhere".to_string(),
        field: "boardId".to_string(),
      },
    );
    assert!(matches!(
      validate(&[s]),
      Err(CatalogError::UnknownBindingSource { .. })
    ));
  }

  #[test]
  fn test_duplicate_id() {
    let specs = vec![spec("a", &[]), spec("a", &[])];
    assert!(matches!(
      validate(&specs),
      Err(CatalogError::DuplicateId { .. })
    ));
  }

  #[test]
  fn test_acyclic_graph_validates() {
    let specs = vec![
      spec("a", &[]),
      spec("b", &["a"]),
      spec("c", &["a", "b"]),
      spec("d", &["c"]),
    ];
    assert!(validate(&specs).is_ok());
  }
}
