use crate::model::EntityConfig;
use crate::schema::path::FieldPath;
use crate::schema::Mode;
use crate::services::cli_runner::{run_cmdline_to_json, run_submit};
use crate::ui::{LoadKind, LoadMsg, LoadOutcome};
use anyhow::{anyhow, Result};
use serde_json::Value as JsonValue;
use std::sync::mpsc::Sender;
use std::thread;

const DEFAULT_UNWRAP: &str = "result";

pub fn get_by_path<'a>(v: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    FieldPath::parse(path).get(v)
}

/// Records from `list_cmd`: the configured unwrap path, then the common
/// envelopes, then a bare array.
pub(crate) fn unwrap_items(v: &JsonValue, unwrap: Option<&str>) -> Option<Vec<JsonValue>> {
    let primary = unwrap.unwrap_or(DEFAULT_UNWRAP);
    [primary, "result.data", "data.items", "data"]
        .iter()
        .find_map(|p| get_by_path(v, p).and_then(|x| x.as_array()))
        .or_else(|| v.as_array())
        .cloned()
}

pub fn load_list(entity: &EntityConfig) -> Result<Vec<JsonValue>> {
    let cmdline = entity
        .list_cmd
        .as_ref()
        .ok_or_else(|| anyhow!("No list command configured for '{}'.", entity.title))?;
    let v = run_cmdline_to_json(cmdline, &entity.context)?;
    unwrap_items(&v, entity.list_unwrap.as_deref())
        .ok_or_else(|| anyhow!("'{}' list output has no record array", entity.title))
}

/// Full record for editing. Without a `read_cmd` the list row is used as-is.
pub fn load_record(entity: &EntityConfig, id: &str) -> Result<Option<JsonValue>> {
    let Some(cmdline) = entity.read_cmd.as_ref() else {
        return Ok(None);
    };
    let mut vars = entity.context.clone();
    vars.insert("RECORD_ID".to_string(), id.to_string());
    let v = run_cmdline_to_json(cmdline, &vars)?;
    let unwrap = entity.read_unwrap.as_deref().unwrap_or(DEFAULT_UNWRAP);
    Ok(Some(get_by_path(&v, unwrap).cloned().unwrap_or(v)))
}

pub fn spawn_load_list(entity: EntityConfig, key: String, tx: Sender<LoadMsg>) {
    thread::spawn(move || {
        let outcome = load_list(&entity)
            .map(LoadOutcome::Items)
            .map_err(|e| format!("{e:#}"));
        let _ = tx.send(LoadMsg {
            key,
            outcome,
            kind: LoadKind::List,
        });
    });
}

pub fn spawn_load_record(
    entity: EntityConfig,
    id: String,
    row: JsonValue,
    key: String,
    tx: Sender<LoadMsg>,
) {
    thread::spawn(move || {
        let outcome = match load_record(&entity, &id) {
            Ok(Some(full)) => Ok(LoadOutcome::Record { id, record: full }),
            Ok(None) => Ok(LoadOutcome::Record { id, record: row }),
            Err(e) => Err(format!("{e:#}")),
        };
        let _ = tx.send(LoadMsg {
            key,
            outcome,
            kind: LoadKind::Record,
        });
    });
}

/// Run the create or update command for one form submission. The result
/// is tagged with the form instance so a closed or replaced dialog ignores it.
pub fn spawn_submit(
    entity: EntityConfig,
    mode: Mode,
    record_id: Option<String>,
    payload: JsonValue,
    instance: u64,
    key: String,
    tx: Sender<LoadMsg>,
) {
    thread::spawn(move || {
        let fallback = format!("Failed to {} {}", mode.verb(), entity.kind.noun());
        let cmd = match mode {
            Mode::Create => entity.create_cmd.as_ref(),
            Mode::Edit => entity.update_cmd.as_ref(),
        };
        let outcome = match cmd {
            None => Err(fallback),
            Some(cmdline) => {
                let mut vars = entity.context.clone();
                if let Some(id) = &record_id {
                    vars.insert("RECORD_ID".to_string(), id.clone());
                }
                run_submit(cmdline, &vars, &payload, &fallback)
                    .map(LoadOutcome::Submitted)
                    .map_err(|e| e.to_string())
            }
        };
        let _ = tx.send(LoadMsg {
            key,
            outcome,
            kind: LoadKind::Submit { instance },
        });
    });
}

#[cfg(test)]
mod loader_tests;
