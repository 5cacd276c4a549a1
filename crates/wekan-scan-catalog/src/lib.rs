//! wekan-scan Catalog
//!
//! This crate describes the endpoints a scan attempts and the order it must
//! attempt them in. A [`Catalog`] is validated and topologically sorted once
//! at construction:
//! - endpoint ids are unique
//! - every `requires` entry and binding source names a known endpoint
//! - the `requires` graph is acyclic
//!
//! The scanner then walks [`Catalog::specs`] front to back without any graph
//! traversal of its own.

mod catalog;
mod error;
mod graph;
mod spec;
mod wekan;

pub use catalog::{Catalog, CatalogDef};
pub use error::CatalogError;
pub use graph::{Graph, validate};
pub use spec::{Binding, EndpointSpec, ExtractRule, Method};
pub use wekan::wekan_endpoints;
