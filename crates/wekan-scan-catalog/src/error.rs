use thiserror::Error;

/// Errors raised for a malformed catalog.
///
/// All of these are fatal to a scan: they describe an inconsistent catalog,
/// never a condition of the server being scanned.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// Two endpoints share an id.
  #[error("duplicate endpoint id: {id}")]
  DuplicateId { id: String },

  /// An endpoint requires an id that is not in the catalog.
  #[error("endpoint '{id}' requires unknown endpoint '{dependency}'")]
  UnknownDependency { id: String, dependency: String },

  /// A binding pulls a field from an id that is not in the catalog.
  #[error("endpoint '{id}' binds '{placeholder}' from unknown endpoint '{source_id}'")]
  UnknownBindingSource {
    id: String,
    placeholder: String,
    source_id: String,
  },

  /// The `requires` graph contains a cycle.
  #[error("cycle detected among endpoints: {}", ids.join(", "))]
  CycleDetected { ids: Vec<String> },

  /// A placeholder could not be resolved from captured results at scan time.
  #[error("endpoint '{id}' cannot resolve '{placeholder}': {message}")]
  UnresolvedBinding {
    id: String,
    placeholder: String,
    message: String,
  },

  /// A body template failed to render.
  #[error("endpoint '{id}' has an invalid body template: {message}")]
  InvalidTemplate { id: String, message: String },

  /// A catalog file could not be read.
  #[error("failed to read catalog file '{path}': {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// A catalog file could not be parsed.
  #[error("failed to parse catalog: {0}")]
  Parse(#[from] serde_json::Error),
}
