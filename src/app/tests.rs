use super::*;
use crate::engine::FormValue;
use crate::schema::EntityKind;
use serde_json::json;

fn state() -> AppState {
    let orgs = EntityConfig {
        list_cmd: Some("cli orgs list".into()),
        create_cmd: Some("cli orgs create".into()),
        update_cmd: Some("cli orgs update ${RECORD_ID}".into()),
        context: [("tenant_code".to_string(), "shikshagraha".to_string())]
            .into_iter()
            .collect(),
        ..EntityConfig::new("orgs", EntityKind::Organization)
    };
    let roles = EntityConfig {
        list_cmd: Some("cli roles list".into()),
        read_cmd: Some("cli roles get ${RECORD_ID}".into()),
        update_cmd: Some("cli roles update".into()),
        ..EntityConfig::new("roles", EntityKind::Role)
    };
    AppState {
        config: crate::model::AppConfig {
            entities: vec![orgs, roles],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn submit_instance(effects: &[Effect]) -> u64 {
    match effects {
        [Effect::Submit { instance, .. }] => *instance,
        other => panic!("expected one submit effect, got {other:?}"),
    }
}

#[test]
fn toggle_requests_list_once_then_collapses() {
    let mut st = state();
    let effs = update(&mut st, AppMsg::ToggleEntity(0));
    match effs.as_slice() {
        [Effect::LoadList { key, entity }] => {
            assert_eq!(key, "entity:orgs");
            assert_eq!(entity.id, "orgs");
        }
        other => panic!("expected list load, got {other:?}"),
    }
    assert!(st.loading.contains("entity:orgs"));

    let _ = update(
        &mut st,
        AppMsg::LoadedList {
            key: "entity:orgs".into(),
            outcome: Ok(LoadOutcome::Items(vec![json!({"id": 1, "name": "A"})])),
        },
    );
    assert_eq!(st.children["entity:orgs"].len(), 1);

    // Collapse, then expand again: cached rows, no reload.
    assert!(update(&mut st, AppMsg::ToggleEntity(0)).is_empty());
    assert!(!st.expanded.contains("entity:orgs"));
    assert!(update(&mut st, AppMsg::ToggleEntity(0)).is_empty());
    assert!(st.expanded.contains("entity:orgs"));
}

#[test]
fn list_failure_sets_error_and_toasts() {
    let mut st = state();
    let effs = update(
        &mut st,
        AppMsg::LoadedList {
            key: "entity:orgs".into(),
            outcome: Err("command failed (status 1): boom".into()),
        },
    );
    assert!(st.last_error.as_deref().unwrap().contains("boom"));
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast { level: ToastLevel::Error, .. }]
    ));
}

#[test]
fn create_form_is_seeded_from_entity_context() {
    let mut st = state();
    let effs = update(&mut st, AppMsg::OpenCreate(0));
    assert!(effs.is_empty());
    let fw = st.form.as_ref().unwrap();
    assert_eq!(fw.session.title, "New Organization");
    assert_eq!(fw.session.state.text("tenant_code"), "shikshagraha");
    assert_eq!(st.focus, Focus::Form);
}

#[test]
fn edit_without_read_cmd_uses_list_row() {
    let mut st = state();
    let row = json!({"id": 7, "name": "Acme", "description": "d", "theming": {"primaryColor": "#111111"}});
    let effs = update(
        &mut st,
        AppMsg::OpenEdit {
            idx: 0,
            key: "entity:orgs/7".into(),
            row,
        },
    );
    assert!(effs.is_empty());
    let fw = st.form.as_ref().unwrap();
    assert_eq!(fw.session.mode, Mode::Edit);
    assert_eq!(fw.session.ctx.record_id.as_deref(), Some("7"));
    assert_eq!(fw.session.state.text("name"), "Acme");
}

#[test]
fn edit_with_read_cmd_fetches_full_record_first() {
    let mut st = state();
    let effs = update(
        &mut st,
        AppMsg::OpenEdit {
            idx: 1,
            key: "entity:roles/3".into(),
            row: json!({"id": 3, "title": "mentor"}),
        },
    );
    match effs.as_slice() {
        [Effect::LoadRecord { id, key, .. }] => {
            assert_eq!(id, "3");
            assert_eq!(key, "entity:roles/3");
        }
        other => panic!("expected record load, got {other:?}"),
    }
    assert!(st.form.is_none());

    let _ = update(
        &mut st,
        AppMsg::LoadedRecord {
            key: "entity:roles/3".into(),
            outcome: Ok(LoadOutcome::Record {
                id: "3".into(),
                record: json!({"id": 3, "title": "mentor", "label": "Mentor", "status": "INACTIVE"}),
            }),
        },
    );
    let fw = st.form.as_ref().unwrap();
    assert_eq!(fw.session.title, "Edit Role");
    assert_eq!(fw.session.state.text("status"), "INACTIVE");
    assert!(st.status_text.is_none());
}

#[test]
fn submit_success_closes_form_and_refreshes_list() {
    let mut st = state();
    let _ = update(
        &mut st,
        AppMsg::OpenEdit {
            idx: 0,
            key: "entity:orgs/7".into(),
            row: json!({"id": 7, "name": "Acme", "description": "d", "theming": {"primaryColor": "#111111"}}),
        },
    );
    let fw = st.form.as_mut().unwrap();
    let effs = fw.dispatch(FormAction::Edit {
        name: "name".into(),
        value: FormValue::text("Acme Ltd"),
    });
    assert!(effs.is_empty());
    let instance = submit_instance(&fw.dispatch(FormAction::Submit));

    let effs = update(
        &mut st,
        AppMsg::SubmitResult {
            key: "entity:orgs".into(),
            instance,
            outcome: Ok(LoadOutcome::Submitted(json!({"ok": true}))),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [
            Effect::ShowToast { level: ToastLevel::Success, .. },
            Effect::CloseForm { .. },
            Effect::LoadList { .. }
        ]
    ));
    if let Effect::ShowToast { text, .. } = &effs[0] {
        assert_eq!(text, "Organization updated successfully");
    }
    crate::ui::run_effects(&mut st, effs);
    assert!(st.form.is_none());
    assert_eq!(st.focus, Focus::Menu);
}

#[test]
fn submit_failure_keeps_form_open_with_message() {
    let mut st = state();
    let _ = update(&mut st, AppMsg::OpenCreate(1));
    // Roles have no create command but the form itself still validates and submits.
    let fw = st.form.as_mut().unwrap();
    let _ = fw.dispatch(FormAction::Edit {
        name: "title".into(),
        value: FormValue::text("mentor"),
    });
    let _ = fw.dispatch(FormAction::Edit {
        name: "label".into(),
        value: FormValue::text("Mentor"),
    });
    let instance = submit_instance(&fw.dispatch(FormAction::Submit));
    let effs = update(
        &mut st,
        AppMsg::SubmitResult {
            key: "entity:roles".into(),
            instance,
            outcome: Err("Role already exists".into()),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast { level: ToastLevel::Error, .. }]
    ));
    let fw = st.form.as_ref().unwrap();
    assert!(!fw.session.busy);
    assert_eq!(fw.session.submit_error.as_deref(), Some("Role already exists"));
}

#[test]
fn stale_result_for_replaced_form_is_dropped() {
    let mut st = state();
    let _ = update(&mut st, AppMsg::OpenCreate(0));
    let old_instance = st.form.as_ref().unwrap().instance();
    // A second dialog replaces the first before its result arrives.
    let _ = update(&mut st, AppMsg::OpenCreate(0));
    assert_ne!(st.form.as_ref().unwrap().instance(), old_instance);
    let effs = update(
        &mut st,
        AppMsg::SubmitResult {
            key: "entity:orgs".into(),
            instance: old_instance,
            outcome: Err("late failure".into()),
        },
    );
    assert!(effs.is_empty());
    let fw = st.form.as_ref().unwrap();
    assert!(fw.session.submit_error.is_none());
    assert!(!fw.session.closed);
}

#[test]
fn schema_override_resolves_against_config_dir() {
    let mut st = state();
    st.config_dir = Some(std::path::PathBuf::from("/etc/admin"));
    st.config.entities[0].schema = Some("forms/org.json".into());
    let p = schema_override_path(&st, &st.config.entities[0]).unwrap();
    assert_eq!(p, std::path::PathBuf::from("/etc/admin/forms/org.json"));
    st.config.entities[1].schema = None;
    assert!(schema_override_path(&st, &st.config.entities[1]).is_none());
}

#[test]
fn late_record_does_not_replace_form_with_unsaved_edits() {
    let mut st = state();
    let effs = update(
        &mut st,
        AppMsg::OpenEdit {
            idx: 1,
            key: "entity:roles/3".into(),
            row: json!({"id": 3, "title": "mentor"}),
        },
    );
    assert!(matches!(effs.as_slice(), [Effect::LoadRecord { .. }]));

    // The user starts another dialog while the role is still loading.
    let _ = update(&mut st, AppMsg::OpenCreate(0));
    let _ = st.form.as_mut().unwrap().dispatch(FormAction::Edit {
        name: "name".into(),
        value: FormValue::text("Half-typed Org"),
    });

    let effs = update(
        &mut st,
        AppMsg::LoadedRecord {
            key: "entity:roles/3".into(),
            outcome: Ok(LoadOutcome::Record {
                id: "3".into(),
                record: json!({"id": 3, "title": "mentor"}),
            }),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast { level: ToastLevel::Info, .. }]
    ));
    let fw = st.form.as_ref().unwrap();
    assert_eq!(fw.session.title, "New Organization");
    assert_eq!(fw.session.state.text("name"), "Half-typed Org");
}

#[test]
fn new_dialog_is_refused_while_form_is_dirty_or_saving() {
    let mut st = state();
    let _ = update(&mut st, AppMsg::OpenCreate(0));
    let instance = st.form.as_ref().unwrap().instance();
    let _ = st.form.as_mut().unwrap().dispatch(FormAction::Edit {
        name: "name".into(),
        value: FormValue::text("Acme"),
    });

    let effs = update(&mut st, AppMsg::OpenCreate(0));
    assert!(matches!(effs.as_slice(), [Effect::ShowToast { .. }]));
    let effs = update(
        &mut st,
        AppMsg::OpenEdit {
            idx: 1,
            key: "entity:roles/3".into(),
            row: json!({"id": 3}),
        },
    );
    assert!(matches!(effs.as_slice(), [Effect::ShowToast { .. }]));
    assert!(!st.loading.contains("entity:roles/3"));
    assert_eq!(st.form.as_ref().unwrap().instance(), instance);

    // Clean again: a new dialog may replace it.
    let _ = st.form.as_mut().unwrap().dispatch(FormAction::Reset);
    let _ = update(&mut st, AppMsg::OpenCreate(0));
    assert_ne!(st.form.as_ref().unwrap().instance(), instance);
}
