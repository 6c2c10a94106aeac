use super::*;
use crate::schema::EntityKind;
use serde_json::json;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn get_by_path_traverses_nested_objects() {
    let v = json!({
        "result": {
            "data": [1, 2, 3],
            "meta": {"page": 1}
        }
    });
    assert_eq!(
        get_by_path(&v, "result.data")
            .unwrap()
            .as_array()
            .unwrap()
            .len(),
        3
    );
    assert_eq!(
        get_by_path(&v, "result.meta.page").unwrap().as_i64().unwrap(),
        1
    );
    assert_eq!(get_by_path(&v, "result.data.1"), Some(&json!(2)));
    assert!(get_by_path(&v, "result.missing").is_none());
    assert!(get_by_path(&v, "").is_none());
}

#[test]
fn unwrap_items_tries_configured_path_then_envelopes() {
    let v = json!({"result": [{"id": 1}]});
    assert_eq!(unwrap_items(&v, None).unwrap().len(), 1);

    let v = json!({"result": {"data": [{"id": 1}, {"id": 2}]}});
    assert_eq!(unwrap_items(&v, None).unwrap().len(), 2);

    let v = json!({"payload": {"rows": [{"id": 1}]}});
    assert_eq!(unwrap_items(&v, Some("payload.rows")).unwrap().len(), 1);

    let v = json!([{"code": "a"}]);
    assert_eq!(unwrap_items(&v, None).unwrap().len(), 1);

    assert!(unwrap_items(&json!({"result": "nope"}), None).is_none());
}

#[cfg(unix)]
#[test]
fn submit_reports_instance_and_failure_text() {
    let (tx, rx) = mpsc::channel();
    let entity = EntityConfig {
        create_cmd: Some("sh -c 'cat >/dev/null; echo boom >&2; exit 1'".into()),
        ..EntityConfig::new("tenants", EntityKind::Tenant)
    };
    spawn_submit(entity, Mode::Create, None, json!({"code": "x"}), 7, "entity:tenants".into(), tx);
    let msg = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(matches!(msg.kind, LoadKind::Submit { instance: 7 }));
    assert_eq!(msg.key, "entity:tenants");
    assert_eq!(msg.outcome.unwrap_err(), "boom");
}

#[test]
fn submit_without_command_uses_fallback_message() {
    let (tx, rx) = mpsc::channel();
    let entity = EntityConfig::new("roles", EntityKind::Role);
    spawn_submit(entity, Mode::Edit, Some("3".into()), json!({}), 1, "entity:roles".into(), tx);
    let msg = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(msg.outcome.unwrap_err(), "Failed to update role");
}
