//! Built-in catalog for the Wekan REST API.
//!
//! Resources created during the scan are titled with the run id and deleted
//! by the `cleanup` endpoints at the end, each of which only depends on the
//! endpoint that created the resource it removes.

use serde_json::json;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::spec::{EndpointSpec, Method};

const BOARDS: &str = "boards";
const LISTS: &str = "lists";
const CARDS: &str = "cards";
const CHECKLISTS: &str = "checklists";
const COMMENTS: &str = "comments";
const CUSTOM_FIELDS: &str = "custom-fields";
const CLEANUP: &str = "cleanup";

fn get(id: &str, path: &str) -> EndpointSpec {
  EndpointSpec::new(id, Method::Get, path)
}

fn post(id: &str, path: &str) -> EndpointSpec {
  EndpointSpec::new(id, Method::Post, path)
}

fn put(id: &str, path: &str) -> EndpointSpec {
  EndpointSpec::new(id, Method::Put, path)
}

fn delete(id: &str, path: &str) -> EndpointSpec {
  EndpointSpec::new(id, Method::Delete, path)
}

fn board_scoped(spec: EndpointSpec) -> EndpointSpec {
  spec.bind("boardId", "create-board", "boardId")
}

fn list_scoped(spec: EndpointSpec) -> EndpointSpec {
  board_scoped(spec).bind("listId", "create-list", "listId")
}

fn card_scoped(spec: EndpointSpec) -> EndpointSpec {
  list_scoped(spec).bind("cardId", "create-card", "cardId")
}

fn checklist_scoped(spec: EndpointSpec) -> EndpointSpec {
  card_scoped(spec).bind("checklistId", "create-checklist", "checklistId")
}

fn custom_field_scoped(spec: EndpointSpec) -> EndpointSpec {
  spec.bind("customFieldId", "create-custom-field", "customFieldId")
}

fn boards() -> Vec<EndpointSpec> {
  vec![
    get("list-public-boards", "/api/boards").category(BOARDS),
    get("boards-count", "/api/boards/count").category(BOARDS),
    post("create-board", "/api/boards")
      .category(BOARDS)
      .body(json!({
        "title": "wekan-scan {{ run_id }}",
        "permission": "private",
        "color": "belize",
      }))
      .extract("boardId", ["/_id", "/board/_id", "/data/_id"]),
    board_scoped(get("get-board", "/api/boards/{boardId}")).category(BOARDS),
    board_scoped(put("update-board-title", "/api/boards/{boardId}/title"))
      .category(BOARDS)
      .body(json!({ "title": "wekan-scan {{ run_id }} (renamed)" })),
    board_scoped(post("add-board-label", "/api/boards/{boardId}/labels"))
      .category(BOARDS)
      .body(json!({ "name": "wekan-scan", "color": "green" })),
    board_scoped(get("board-attachments", "/api/boards/{boardId}/attachments")).category(BOARDS),
    board_scoped(get("export-board", "/api/boards/{boardId}/export.json")).category(BOARDS),
    board_scoped(post("copy-board", "/api/boards/{boardId}/copy"))
      .category(BOARDS)
      .body(json!({ "title": "wekan-scan {{ run_id }} (copy)" }))
      .extract("copiedBoardId", ["/_id", "/board/_id", "/data/_id"]),
    board_scoped(get("get-swimlanes", "/api/boards/{boardId}/swimlanes"))
      .category(BOARDS)
      .extract("swimlaneId", ["/0/_id", "/swimlanes/0/_id"]),
  ]
}

fn lists() -> Vec<EndpointSpec> {
  vec![
    board_scoped(get("get-lists", "/api/boards/{boardId}/lists")).category(LISTS),
    board_scoped(post("create-list", "/api/boards/{boardId}/lists"))
      .category(LISTS)
      .body(json!({
        "title": "wekan-scan list {{ run_id }}",
        "boardId": "{{ boardId }}",
      }))
      .extract("listId", ["/_id", "/list/_id", "/data/_id"]),
    list_scoped(get("get-list", "/api/boards/{boardId}/lists/{listId}")).category(LISTS),
    list_scoped(put("edit-list", "/api/boards/{boardId}/lists/{listId}"))
      .category(LISTS)
      .body(json!({ "title": "wekan-scan list {{ run_id }} (edited)" })),
  ]
}

fn cards() -> Vec<EndpointSpec> {
  vec![
    list_scoped(post("create-card", "/api/boards/{boardId}/lists/{listId}/cards"))
      .bind("swimlaneId", "get-swimlanes", "swimlaneId")
      .category(CARDS)
      .body(json!({
        "title": "wekan-scan card {{ run_id }}",
        "description": "created by wekan-scan",
        "boardId": "{{ boardId }}",
        "listId": "{{ listId }}",
        "swimlaneId": "{{ swimlaneId }}",
      }))
      .extract("cardId", ["/_id", "/card/_id", "/data/_id"]),
    card_scoped(get(
      "get-card",
      "/api/boards/{boardId}/lists/{listId}/cards/{cardId}",
    ))
    .category(CARDS),
    card_scoped(put(
      "edit-card",
      "/api/boards/{boardId}/lists/{listId}/cards/{cardId}",
    ))
    .category(CARDS)
    .body(json!({
      "title": "wekan-scan card {{ run_id }} (edited)",
      "description": "edited by wekan-scan",
    })),
    board_scoped(get("board-cards", "/api/boards/{boardId}/cards"))
      .requires("create-card")
      .category(CARDS),
    board_scoped(get("board-cards-count", "/api/boards/{boardId}/cards/count")).category(CARDS),
    list_scoped(get(
      "list-cards-count",
      "/api/boards/{boardId}/lists/{listId}/cards/count",
    ))
    .category(CARDS),
    board_scoped(get(
      "swimlane-cards",
      "/api/boards/{boardId}/swimlanes/{swimlaneId}/cards",
    ))
    .bind("swimlaneId", "get-swimlanes", "swimlaneId")
    .category(CARDS),
  ]
}

fn checklists() -> Vec<EndpointSpec> {
  let item_path = "/api/cards/{cardId}/checklists/{checklistId}/items/{itemId}";
  vec![
    card_scoped(get("get-checklists", "/api/cards/{cardId}/checklists")).category(CHECKLISTS),
    card_scoped(post("create-checklist", "/api/cards/{cardId}/checklists"))
      .category(CHECKLISTS)
      .body(json!({ "title": "wekan-scan checklist {{ run_id }}" }))
      .extract("checklistId", ["/_id", "/checklist/_id", "/data/_id"]),
    checklist_scoped(get(
      "get-checklist",
      "/api/cards/{cardId}/checklists/{checklistId}",
    ))
    .category(CHECKLISTS),
    checklist_scoped(post(
      "create-checklist-item",
      "/api/cards/{cardId}/checklists/{checklistId}/items",
    ))
    .category(CHECKLISTS)
    .body(json!({ "title": "wekan-scan item {{ run_id }}" }))
    .extract("itemId", ["/_id", "/item/_id", "/data/_id"]),
    checklist_scoped(get("get-checklist-item", item_path))
      .bind("itemId", "create-checklist-item", "itemId")
      .category(CHECKLISTS),
    checklist_scoped(put("edit-checklist-item", item_path))
      .bind("itemId", "create-checklist-item", "itemId")
      .category(CHECKLISTS)
      .body(json!({ "title": "wekan-scan item {{ run_id }} (done)", "isFinished": true })),
    checklist_scoped(delete("delete-checklist-item", item_path))
      .bind("itemId", "create-checklist-item", "itemId")
      .category(CHECKLISTS),
    checklist_scoped(delete(
      "delete-checklist",
      "/api/cards/{cardId}/checklists/{checklistId}",
    ))
    .category(CHECKLISTS),
  ]
}

fn comments() -> Vec<EndpointSpec> {
  let comment_path = "/api/cards/{cardId}/comments/{commentId}";
  vec![
    card_scoped(get("get-comments", "/api/cards/{cardId}/comments")).category(COMMENTS),
    card_scoped(post("create-comment", "/api/cards/{cardId}/comments"))
      .category(COMMENTS)
      .body(json!({
        "cardId": "{{ cardId }}",
        "boardId": "{{ boardId }}",
        "text": "wekan-scan comment {{ run_id }}",
      }))
      .extract("commentId", ["/_id", "/comment/_id", "/data/_id"]),
    card_scoped(get("get-comment", comment_path))
      .bind("commentId", "create-comment", "commentId")
      .category(COMMENTS),
    card_scoped(delete("delete-comment", comment_path))
      .bind("commentId", "create-comment", "commentId")
      .category(COMMENTS),
  ]
}

fn custom_fields() -> Vec<EndpointSpec> {
  let field_path = "/api/custom-fields/{customFieldId}";
  let item_path = "/api/custom-fields/{customFieldId}/dropdown-items/{dropdownItemId}";
  vec![
    get("get-custom-fields", "/api/custom-fields").category(CUSTOM_FIELDS),
    board_scoped(post("create-custom-field", "/api/custom-fields"))
      .category(CUSTOM_FIELDS)
      .body(json!({
        "boardId": "{{ boardId }}",
        "name": "wekan-scan field {{ run_id }}",
        "type": "dropdown",
        "settings": {},
      }))
      .extract("customFieldId", ["/_id", "/customField/_id", "/data/_id"]),
    custom_field_scoped(get("get-custom-field", field_path)).category(CUSTOM_FIELDS),
    custom_field_scoped(put("edit-custom-field", field_path))
      .category(CUSTOM_FIELDS)
      .body(json!({ "name": "wekan-scan field {{ run_id }} (edited)" })),
    custom_field_scoped(post(
      "add-dropdown-item",
      "/api/custom-fields/{customFieldId}/dropdown-items",
    ))
    .category(CUSTOM_FIELDS)
    .body(json!({ "name": "wekan-scan option", "color": "blue" }))
    .extract("dropdownItemId", ["/_id", "/dropdownItem/_id", "/0/_id"]),
    board_scoped(custom_field_scoped(put(
      "edit-card-custom-field",
      "/api/boards/{boardId}/cards/{cardId}/custom-field",
    )))
    .bind("cardId", "create-card", "cardId")
    .bind("dropdownItemId", "add-dropdown-item", "dropdownItemId")
    .category(CARDS)
    .body(json!({
      "customFieldId": "{{ customFieldId }}",
      "value": "{{ dropdownItemId }}",
    })),
    board_scoped(custom_field_scoped(get(
      "cards-by-custom-field",
      "/api/boards/{boardId}/cards/custom-field?customFieldId={customFieldId}&value={dropdownItemId}",
    )))
    .bind("dropdownItemId", "add-dropdown-item", "dropdownItemId")
    .requires("edit-card-custom-field")
    .category(CARDS),
    custom_field_scoped(put("edit-dropdown-item", item_path))
      .bind("dropdownItemId", "add-dropdown-item", "dropdownItemId")
      .category(CUSTOM_FIELDS)
      .body(json!({ "name": "wekan-scan option (edited)" })),
    custom_field_scoped(delete("delete-dropdown-item", item_path))
      .bind("dropdownItemId", "add-dropdown-item", "dropdownItemId")
      .category(CUSTOM_FIELDS),
    custom_field_scoped(delete("delete-custom-field", field_path)).category(CUSTOM_FIELDS),
  ]
}

fn cleanup() -> Vec<EndpointSpec> {
  vec![
    card_scoped(delete(
      "delete-card",
      "/api/boards/{boardId}/lists/{listId}/cards/{cardId}",
    ))
    .category(CLEANUP),
    list_scoped(delete("delete-list", "/api/boards/{boardId}/lists/{listId}")).category(CLEANUP),
    delete("delete-copied-board", "/api/boards/{copiedBoardId}")
      .bind("copiedBoardId", "copy-board", "copiedBoardId")
      .category(CLEANUP),
    board_scoped(delete("delete-board", "/api/boards/{boardId}")).category(CLEANUP),
  ]
}

/// Every endpoint of the built-in Wekan catalog, in declaration order.
pub fn wekan_endpoints() -> Vec<EndpointSpec> {
  [
    boards(),
    lists(),
    cards(),
    checklists(),
    comments(),
    custom_fields(),
    cleanup(),
  ]
  .into_iter()
  .flatten()
  .collect()
}

impl Catalog {
  /// The built-in Wekan catalog.
  pub fn wekan() -> Result<Self, CatalogError> {
    Self::new(wekan_endpoints())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wekan_catalog_validates() {
    let catalog = Catalog::wekan().unwrap();
    assert_eq!(catalog.len(), wekan_endpoints().len());
  }

  #[test]
  fn test_every_placeholder_is_bound_from_a_requirement() {
    for spec in wekan_endpoints() {
      for placeholder in spec.placeholders() {
        let binding = spec
          .bindings
          .get(placeholder)
          .unwrap_or_else(|| panic!("{}: unbound placeholder {}", spec.id, placeholder));
        assert!(
          spec.requires.contains(&binding.from),
          "{}: binding source {} not required",
          spec.id,
          binding.from
        );
      }
    }
  }

  #[test]
  fn test_bindings_name_extracted_fields() {
    let specs = wekan_endpoints();
    for spec in &specs {
      for binding in spec.bindings.values() {
        let source = specs.iter().find(|s| s.id == binding.from).unwrap();
        assert!(
          source.extract.contains_key(&binding.field),
          "{}: {} does not extract {}",
          spec.id,
          binding.from,
          binding.field
        );
      }
    }
  }

  #[test]
  fn test_cleanup_runs_last() {
    let catalog = Catalog::wekan().unwrap();
    let ids: Vec<&str> = catalog.ids().collect();
    let tail = &ids[ids.len() - 4..];
    assert_eq!(
      tail,
      ["delete-card", "delete-list", "delete-copied-board", "delete-board"]
    );
  }

  #[test]
  fn test_card_custom_field_endpoints() {
    let catalog = Catalog::wekan().unwrap();
    let position = |id: &str| catalog.ids().position(|x| x == id).unwrap();

    let edit = catalog.get("edit-card-custom-field").unwrap();
    assert!(edit.requires.iter().any(|r| r == "create-card"));
    assert!(edit.requires.iter().any(|r| r == "create-custom-field"));
    assert_eq!(
      catalog.get("cards-by-custom-field").unwrap().placeholders(),
      ["boardId", "customFieldId", "dropdownItemId"]
    );
    assert!(catalog.get("board-cards").unwrap().requires.iter().any(|r| r == "create-card"));

    // Both run while the field and its option still exist
    assert!(position("edit-card-custom-field") < position("cards-by-custom-field"));
    assert!(position("cards-by-custom-field") < position("delete-dropdown-item"));
    assert!(position("cards-by-custom-field") < position("delete-custom-field"));
    assert!(position("edit-card-custom-field") < position("delete-card"));
  }

  #[test]
  fn test_create_board_comes_before_its_dependents() {
    let catalog = Catalog::wekan().unwrap();
    let position = |id: &str| catalog.ids().position(|x| x == id).unwrap();

    assert!(position("create-board") < position("create-list"));
    assert!(position("create-list") < position("create-card"));
    assert!(position("get-swimlanes") < position("create-card"));
    assert!(position("create-card") < position("create-comment"));
  }
}
