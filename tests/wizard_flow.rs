mod common;

use common::{MockApi, object, view};
use serde_json::json;
use tryton_console::api::{WizardButton, WizardStepResult, WizardView};
use tryton_console::error::ConsoleError;
use tryton_console::fields::FieldValue;
use tryton_console::wizard::{WizardPhase, WizardSession};

fn start_view() -> WizardView {
    WizardView {
        state: "start".into(),
        architecture: view(
            "party.merge.start",
            "form",
            r#"<form><group id="g"><field name="target"/><field name="note"/></group></form>"#,
            json!({
                "target": {"type": "many2one", "relation": "party.party", "required": true, "string": "Target"},
                "note": {"type": "char", "string": "Note"}
            }),
        ),
        defaults: object(json!({"note": "duplicate"})),
        buttons: vec![
            WizardButton {
                label: "Cancel".into(),
                state: "end".into(),
                default: false,
                validate: false,
            },
            WizardButton {
                label: "Merge".into(),
                state: "merge".into(),
                default: true,
                validate: true,
            },
        ],
    }
}

fn api() -> MockApi {
    MockApi::new().with_name("party.party", 5, "Acme Corp").with_wizard_steps(vec![
        WizardStepResult::Continue(start_view()),
        WizardStepResult::Success {
            actions: vec![json!({"type": "ir.action.act_window", "res_model": "party.party"})],
        },
    ])
}

#[tokio::test]
async fn test_wizard_runs_to_completion() {
    let api = api();
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();

    let form = session.form().unwrap();
    assert_eq!(form.value("note"), Some(&FieldValue::Text("duplicate".into())));
    assert!(form.is_new());
    assert!(!form.is_dirty());
    assert_eq!(session.buttons().len(), 2);

    session.form_mut().unwrap().set_input("target", "5").unwrap();
    session.press(&api, "merge").await.unwrap();

    let executed = api.executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 1);
    let (form_state, button_state, payload) = &executed[0];
    assert_eq!((form_state.as_str(), button_state.as_str()), ("start", "merge"));
    assert_eq!(payload, &object(json!({"target": 5, "note": "duplicate"})));

    let WizardPhase::Finished { actions } = session.phase() else {
        panic!("wizard should have finished");
    };
    assert_eq!(actions.len(), 1);
    assert!(api.deleted_wizards.lock().unwrap().contains(&7));
}

#[tokio::test]
async fn test_validating_button_needs_required_values() {
    let api = api();
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();

    let error = session.press(&api, "merge").await.unwrap_err();
    assert!(matches!(error, ConsoleError::Validation { .. }));
    assert_eq!(api.count("execute_wizard_step"), 0);
    assert!(!session.is_finished());
    assert!(session.form().unwrap().errors().fields.contains_key("target"));
}

#[tokio::test]
async fn test_unknown_button_is_rejected() {
    let api = api();
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();
    assert!(matches!(
        session.press(&api, "explode").await,
        Err(ConsoleError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_cancel_deletes_the_instance() {
    let api = api();
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();

    session.cancel(&api).await;
    assert!(session.is_finished());
    assert_eq!(api.count("delete_wizard_instance"), 1);

    session.cancel(&api).await;
    assert_eq!(api.count("delete_wizard_instance"), 1);
}

#[tokio::test]
async fn test_server_rejection_stays_on_the_form() {
    let api = api().failing(
        "execute_wizard_step",
        ConsoleError::validation("The parties belong to different companies"),
    );
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();
    session.form_mut().unwrap().set_input("target", "5").unwrap();

    assert!(session.press(&api, "merge").await.is_err());
    assert!(!session.is_finished());
    assert_eq!(
        session.form().unwrap().errors().form.as_deref(),
        Some("The parties belong to different companies")
    );
}

#[tokio::test]
async fn test_unreadable_step_keeps_the_wizard_open() {
    let api = api().failing(
        "execute_wizard_step",
        ConsoleError::Protocol("view for 'party.merge.ask' has no type".into()),
    );
    let mut session = WizardSession::start(&api, "party.merge", 100).await.unwrap();
    session.form_mut().unwrap().set_input("target", "5").unwrap();

    let error = session.press(&api, "merge").await.unwrap_err();
    assert!(matches!(error, ConsoleError::Protocol(_)));
    assert!(!session.is_finished());
    assert_eq!(api.count("delete_wizard_instance"), 0);
}
