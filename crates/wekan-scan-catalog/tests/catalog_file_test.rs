//! Loading catalogs from disk.

use std::io::Write;

use wekan_scan_catalog::{Catalog, CatalogError, Method};

fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
  let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
  file
    .write_all(contents.as_bytes())
    .expect("failed to write catalog");
  file
}

#[test]
fn test_from_path_orders_and_defaults() {
  let file = write_catalog(
    r#"{
      "endpoints": [
        {
          "id": "get-board",
          "method": "GET",
          "path": "/api/boards/{boardId}",
          "bindings": { "boardId": { "from": "create-board", "field": "boardId" } },
          "requires": ["create-board"]
        },
        {
          "id": "create-board",
          "method": "POST",
          "path": "/api/boards",
          "category": "boards",
          "body": { "title": "scan {{ run_id }}" },
          "expect": [200, 201],
          "extract": { "boardId": ["/_id", "/board/_id"] }
        }
      ]
    }"#,
  );

  let catalog = Catalog::from_path(file.path()).unwrap();
  let ids: Vec<&str> = catalog.ids().collect();
  assert_eq!(ids, vec!["create-board", "get-board"]);

  let create = catalog.get("create-board").unwrap();
  assert_eq!(create.method, Method::Post);
  assert!(create.expect.contains(&201));
  assert_eq!(create.extract["boardId"].pointers().len(), 2);

  let get = catalog.get("get-board").unwrap();
  assert_eq!(get.category, "general");
  assert!(get.expect.contains(&200));
  assert_eq!(get.placeholders(), vec!["boardId"]);
}

#[test]
fn test_from_path_rejects_unknown_binding_source() {
  let file = write_catalog(
    r#"{
      "endpoints": [
        {
          "id": "get-board",
          "method": "GET",
          "path": "/api/boards/{boardId}",
          "bindings": { "boardId": { "from": "create-board", "field": "boardId" } }
        }
      ]
    }"#,
  );

  assert!(matches!(
    Catalog::from_path(file.path()),
    Err(CatalogError::UnknownBindingSource { ref source_id, .. }) if source_id == "create-board"
  ));
}

#[test]
fn test_from_path_missing_file() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let err = Catalog::from_path(dir.path().join("absent.json")).unwrap_err();
  assert!(matches!(err, CatalogError::Io { .. }));
  assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_builtin_catalog_exports_and_reloads() {
  let builtin = Catalog::wekan().unwrap();
  let file = write_catalog(&serde_json::to_string_pretty(&builtin.to_def()).unwrap());

  let reloaded = Catalog::from_path(file.path()).unwrap();
  assert_eq!(reloaded.len(), builtin.len());
  assert_eq!(
    reloaded.ids().collect::<Vec<_>>(),
    builtin.ids().collect::<Vec<_>>()
  );
}
