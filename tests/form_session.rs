//! Form session behaviour: dirty tracking, payloads and hydration

mod common;

use common::{MockApi, object, view};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tryton_console::error::ConsoleError;
use tryton_console::fields::{FieldValue, RelationRef};
use tryton_console::form::{FormSession, hydrate};
use tryton_console::view::{SelectionOption, ViewArchitecture};

fn sale_view() -> Arc<ViewArchitecture> {
    Arc::new(view(
        "sale.sale",
        "form",
        r#"<form>
            <group id="head">
                <field name="reference"/><field name="party"/><field name="state"/>
            </group>
            <page string="Other" id="other"><field name="quantity"/><field name="tags"/></page>
        </form>"#,
        json!({
            "reference": {"type": "char", "string": "Reference", "required": true},
            "party": {"type": "many2one", "relation": "party.party", "string": "Party"},
            "state": {"type": "selection", "selection": "get_states", "string": "State"},
            "quantity": {"type": "integer", "string": "Quantity"},
            "tags": {"type": "many2many", "relation": "sale.tag", "string": "Tags"},
            "number": {"type": "char", "readonly": true},
            "lines": {"type": "one2many", "relation": "sale.line"}
        }),
    ))
}

fn sale_record() -> Map<String, Value> {
    object(json!({
        "id": 12,
        "reference": "SO-12",
        "party": 5,
        "party.": {"rec_name": "Acme Corp"},
        "state": "draft",
        "quantity": 3,
        "tags": [1, 2],
        "number": "N/12",
        "lines": [40, 41]
    }))
}

#[test]
fn test_set_value_then_discard_restores_baseline() {
    let mut form = FormSession::open(Some(&sale_record()), sale_view());
    let baseline = form.current_values().clone();
    assert!(!form.is_dirty());

    form.set_value("quantity", FieldValue::Integer(4)).unwrap();
    assert!(form.is_dirty());

    form.discard();
    assert!(!form.is_dirty());
    assert_eq!(form.current_values(), &baseline);
    assert_eq!(form.initial_values(), &baseline);
}

#[test]
fn test_setting_back_to_baseline_is_clean() {
    let mut form = FormSession::open(Some(&sale_record()), sale_view());
    form.set_input("reference", "SO-99").unwrap();
    assert!(form.is_dirty());
    form.set_input("reference", "SO-12").unwrap();
    assert!(!form.is_dirty());
}

#[test]
fn test_many2one_expansion_opens_as_reference() {
    let party_view = Arc::new(view(
        "sale.sale",
        "form",
        r#"<form><field name="party"/></form>"#,
        json!({"party": {"type": "many2one", "relation": "party.party"}}),
    ));
    let record = object(json!({"id": 1, "party": 5, "party.": {"rec_name": "Acme Corp"}}));
    let form = FormSession::open(Some(&record), party_view);

    assert_eq!(
        form.value("party"),
        Some(&FieldValue::Reference(RelationRef::new(5, "Acme Corp")))
    );
    assert_eq!(form.to_wire_payload(), object(json!({"party": 5})));
}

#[test]
fn test_new_record_takes_field_defaults_and_stays_clean() {
    let arch = Arc::new(view(
        "sale.sale",
        "form",
        r#"<form><field name="status"/></form>"#,
        json!({"status": {"type": "char", "default": "draft"}}),
    ));
    let form = FormSession::open(None, arch);

    assert!(form.is_new());
    assert_eq!(form.value("status"), Some(&FieldValue::Text("draft".into())));
    assert!(!form.is_dirty());
}

#[test]
fn test_field_defaults_win_over_server_defaults() {
    let arch = Arc::new(view(
        "sale.sale",
        "form",
        "<form/>",
        json!({
            "status": {"type": "char", "default": "draft"},
            "quantity": {"type": "integer"}
        }),
    ));
    let server = object(json!({"status": "confirmed", "quantity": 1}));
    let form = FormSession::open_with_defaults(arch, &server);

    assert_eq!(form.value("status"), Some(&FieldValue::Text("draft".into())));
    assert_eq!(form.value("quantity"), Some(&FieldValue::Integer(1)));
    assert!(!form.is_dirty());
}

#[tokio::test]
async fn test_method_selection_waits_for_options() {
    let api = MockApi::new().with_selection("sale.sale", "get_states", json!([["a", "Alpha"], ["b", "Beta"]]));
    let mut form = FormSession::open(Some(&sale_record()), sale_view());

    assert!(form.selection_options("state").is_empty());
    assert!(!form.is_submittable("state"));
    assert!(!form.to_wire_payload().contains_key("state"));
    assert!(form.set_input("state", "a").is_err());

    hydrate::resolve_selections(&api, &mut form).await.unwrap();

    assert_eq!(
        form.selection_options("state"),
        &[SelectionOption::new("a", "Alpha"), SelectionOption::new("b", "Beta")]
    );
    assert!(form.is_submittable("state"));
    form.set_input("state", "Beta").unwrap();
    assert_eq!(form.value("state"), Some(&FieldValue::Text("b".into())));
}

#[tokio::test]
async fn test_selection_options_are_written_once() {
    let api = MockApi::new().with_selection("sale.sale", "get_states", json!([["a", "Alpha"]]));
    let mut form = FormSession::open(Some(&sale_record()), sale_view());

    hydrate::resolve_selections(&api, &mut form).await.unwrap();
    hydrate::resolve_selections(&api, &mut form).await.unwrap();

    assert_eq!(api.count("resolve_selection_options"), 1);
    assert!(!form.set_selection_options("state", Vec::new()));
}

#[test]
fn test_payloads_skip_readonly_and_inert_fields() {
    let mut form = FormSession::open(Some(&sale_record()), sale_view());
    form.set_selection_options("state", vec![SelectionOption::new("draft", "Draft")]);

    let payload = form.to_wire_payload();
    assert!(!payload.contains_key("number"));
    assert!(!payload.contains_key("lines"));
    assert_eq!(payload.get("party"), Some(&json!(5)));
    assert_eq!(payload.get("tags"), Some(&json!([1, 2])));

    assert!(form.changed_payload().is_empty());
    form.set_input("quantity", "8").unwrap();
    assert_eq!(form.changed_payload(), object(json!({"quantity": 8})));

    assert!(form.set_input("number", "N/13").is_err());
    assert!(form.set_input("lines", "1").is_err());
}

#[test]
fn test_required_fields_block_saving() {
    let mut form = FormSession::open(None, sale_view());
    assert_eq!(form.missing_required(), vec!["reference"]);

    let error = form.check_required().unwrap_err();
    assert!(matches!(error, ConsoleError::Validation { field: Some(ref f), .. } if f == "reference"));
    assert!(form.errors().fields.contains_key("reference"));

    form.set_input("reference", "SO-1").unwrap();
    assert!(form.check_required().is_ok());
    assert!(!form.errors().fields.contains_key("reference"));
}

#[test]
fn test_server_errors_keep_current_values() {
    let mut form = FormSession::open(Some(&sale_record()), sale_view());
    form.set_input("quantity", "-1").unwrap();
    let before = form.current_values().clone();

    assert!(form.apply_server_error(&ConsoleError::field_validation("quantity", "must be positive")));
    assert!(form.apply_server_error(&ConsoleError::validation("The sale cannot be modified")));
    assert!(!form.apply_server_error(&ConsoleError::Transport("timeout".into())));

    assert_eq!(form.current_values(), &before);
    assert_eq!(form.errors().fields.get("quantity").map(String::as_str), Some("must be positive"));
    assert_eq!(form.errors().form.as_deref(), Some("The sale cannot be modified"));
    assert!(form.is_dirty());
}

#[tokio::test]
async fn test_pending_reference_resolution_keeps_form_clean() {
    let api = MockApi::new().with_name("party.party", 9, "Globex").with_name("party.party", 10, "Initech");
    let record = object(json!({"id": 3, "reference": "SO-3", "party": 9, "tags": []}));
    let mut form = FormSession::open(Some(&record), sale_view());
    assert_eq!(form.value("party"), Some(&FieldValue::Pending(9)));

    hydrate::resolve_pending_references(&api, &mut form).await.unwrap();
    assert_eq!(form.value("party"), Some(&FieldValue::Reference(RelationRef::new(9, "Globex"))));
    assert!(!form.is_dirty());

    form.set_input("party", "#10").unwrap();
    assert!(form.is_dirty());
    hydrate::resolve_pending_references(&api, &mut form).await.unwrap();
    assert_eq!(form.display_value("party"), "Initech");
    assert_eq!(form.changed_payload(), object(json!({"party": 10})));
}

#[tokio::test]
async fn test_failed_lookups_stay_queued() {
    let api = MockApi::new().failing("read_display_names", ConsoleError::Transport("connection reset".into()));
    let record = object(json!({"id": 3, "party": 9}));
    let mut form = FormSession::open(Some(&record), sale_view());

    assert!(hydrate::resolve_pending_references(&api, &mut form).await.is_err());
    assert_eq!(form.value("party"), Some(&FieldValue::Pending(9)));
    assert_eq!(form.take_pending_lookups().len(), 1);
}

#[tokio::test]
async fn test_hydrate_pages_many2many_names() {
    let api = MockApi::new()
        .with_selection("sale.sale", "get_states", json!([["draft", "Draft"]]))
        .with_name("sale.tag", 1, "Urgent")
        .with_name("sale.tag", 2, "Export")
        .with_name("party.party", 5, "Acme Corp");
    let mut form = FormSession::open(Some(&sale_record()), sale_view());

    hydrate::hydrate(&api, &mut form, 1).await.unwrap();

    assert_eq!(api.count("read_display_names sale.tag"), 2);
    assert_eq!(form.display_value("tags"), "Urgent, Export");
    assert_eq!(form.display_value("state"), "Draft");
    assert!(!form.is_dirty());
}
