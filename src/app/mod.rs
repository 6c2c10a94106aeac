use crate::engine::{FormAction, FormContext, FormSession};
use crate::model::EntityConfig;
use crate::nav::keys::{entity_key, record_id};
use crate::schema::{load_schema, Mode};
use crate::ui::{AppState, Focus, LoadOutcome, ToastLevel};
use crate::widgets::form_widget::FormWidget;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

pub enum AppMsg {
    ToggleEntity(usize),
    RefreshEntity(usize),
    OpenCreate(usize),
    OpenEdit {
        idx: usize,
        key: String,
        row: JsonValue,
    },
    LoadedList {
        key: String,
        outcome: Result<LoadOutcome, String>,
    },
    LoadedRecord {
        key: String,
        outcome: Result<LoadOutcome, String>,
    },
    SubmitResult {
        key: String,
        instance: u64,
        outcome: Result<LoadOutcome, String>,
    },
}

#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Effect {
    LoadList {
        entity: EntityConfig,
        key: String,
    },
    LoadRecord {
        entity: EntityConfig,
        id: String,
        row: JsonValue,
        key: String,
    },
    Submit {
        entity: EntityConfig,
        mode: Mode,
        record_id: Option<String>,
        payload: JsonValue,
        instance: u64,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    CopyToClipboard {
        text: String,
    },
    CloseForm {
        instance: u64,
    },
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        ToggleEntity(idx) => {
            let Some(e) = state.config.entities.get(idx) else {
                return effects;
            };
            let key = entity_key(e);
            if state.expanded.remove(&key) {
                return effects;
            }
            state.expanded.insert(key.clone());
            if !state.children.contains_key(&key) && !state.loading.contains(&key) {
                if let Some(eff) = list_effect(state, idx) {
                    effects.push(eff);
                }
            }
        }
        RefreshEntity(idx) => {
            if let Some(e) = state.config.entities.get(idx) {
                state.expanded.insert(entity_key(e));
            }
            if let Some(eff) = list_effect(state, idx) {
                effects.push(eff);
            }
        }
        OpenCreate(idx) => {
            effects.extend(open_form(state, idx, Mode::Create, None, None));
        }
        OpenEdit { idx, key, row } => {
            let Some(e) = state.config.entities.get(idx).cloned() else {
                return effects;
            };
            if e.update_cmd.is_none() {
                effects.push(toast(
                    format!("{} records are read-only here", e.title),
                    ToastLevel::Info,
                ));
                return effects;
            }
            if let Some(eff) = open_form_guard(state) {
                effects.push(eff);
                return effects;
            }
            let id = record_id(&row, crate::engine::profile::profile(e.kind).id_key);
            match id {
                Some(id) if e.read_cmd.is_some() => {
                    tracing::debug!(%key, %id, "reading full record");
                    state.loading.insert(key.clone());
                    state.status_text = Some(format!("Loading {} {id}…", e.kind.noun()));
                    effects.push(Effect::LoadRecord {
                        entity: e,
                        id,
                        row,
                        key,
                    });
                }
                id => effects.extend(open_form(state, idx, Mode::Edit, Some(row), id)),
            }
        }
        LoadedList { key, outcome } => match outcome {
            Ok(LoadOutcome::Items(arr)) => {
                tracing::info!(%key, count = arr.len(), "list loaded");
                state.children.insert(key.clone(), arr);
                state.expanded.insert(key);
                state.last_error = None;
            }
            Ok(other) => {
                tracing::warn!(%key, ?other, "unexpected outcome for list load");
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "list load failed");
                state.last_error = Some(e.clone());
                effects.push(toast(e, ToastLevel::Error));
            }
        },
        LoadedRecord { key, outcome } => {
            state.status_text = None;
            match outcome {
                Ok(LoadOutcome::Record { id, record }) => {
                    let parent = key.split('/').next().unwrap_or_default();
                    match state
                        .config
                        .entities
                        .iter()
                        .position(|e| entity_key(e) == parent)
                    {
                        Some(idx) => {
                            effects.extend(open_form(state, idx, Mode::Edit, Some(record), Some(id)))
                        }
                        None => tracing::warn!(%key, "record loaded for unknown entity"),
                    }
                }
                Ok(other) => {
                    tracing::warn!(%key, ?other, "unexpected outcome for record load");
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "record load failed");
                    state.last_error = Some(e.clone());
                    effects.push(toast(e, ToastLevel::Error));
                }
            }
        }
        SubmitResult {
            key,
            instance,
            outcome,
        } => {
            state.status_text = None;
            let succeeded = outcome.is_ok();
            let action = match outcome {
                Ok(LoadOutcome::Submitted(response)) => {
                    tracing::info!(%key, instance, %response, "submission accepted");
                    FormAction::SubmitSucceeded { instance }
                }
                Ok(_) => FormAction::SubmitSucceeded { instance },
                Err(message) => FormAction::SubmitFailed { instance, message },
            };
            match state.form.as_mut() {
                Some(fw) if fw.instance() == instance => effects.extend(fw.dispatch(action)),
                _ => tracing::debug!(instance, "submission result for a form that is gone"),
            }
            // The record changed remotely whether or not its dialog is still open.
            if succeeded {
                if let Some(idx) = state
                    .config
                    .entities
                    .iter()
                    .position(|e| entity_key(e) == key)
                {
                    if let Some(eff) = list_effect(state, idx) {
                        effects.push(eff);
                    }
                }
            }
        }
    }
    effects
}

fn toast(text: impl Into<String>, level: ToastLevel) -> Effect {
    Effect::ShowToast {
        text: text.into(),
        level,
        seconds: 3,
    }
}

fn list_effect(state: &mut AppState, idx: usize) -> Option<Effect> {
    let e = state.config.entities.get(idx)?;
    e.list_cmd.as_ref()?;
    let key = entity_key(e);
    state.loading.insert(key.clone());
    Some(Effect::LoadList {
        entity: e.clone(),
        key,
    })
}

/// Schema override paths are relative to the directory holding the config.
pub(crate) fn schema_override_path(state: &AppState, entity: &EntityConfig) -> Option<PathBuf> {
    let rel = PathBuf::from(entity.schema.as_ref()?);
    if rel.is_absolute() {
        return Some(rel);
    }
    let base = state
        .config_dir
        .clone()
        .or_else(|| std::env::var("ADMIN_TUI_CONFIG_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    Some(base.join(rel))
}

/// A dialog with unsaved edits or a submission in flight is never replaced.
fn open_form_guard(state: &AppState) -> Option<Effect> {
    let fw = state.form.as_ref()?;
    if !fw.session.busy && !fw.session.is_dirty() {
        return None;
    }
    tracing::debug!(instance = fw.instance(), "open form kept; new dialog refused");
    Some(toast("Finish or cancel the open form first", ToastLevel::Info))
}

fn open_form(
    state: &mut AppState,
    idx: usize,
    mode: Mode,
    record: Option<JsonValue>,
    record_id: Option<String>,
) -> Vec<Effect> {
    if let Some(eff) = open_form_guard(state) {
        return vec![eff];
    }
    let Some(entity) = state.config.entities.get(idx).cloned() else {
        return Vec::new();
    };
    let override_path = schema_override_path(state, &entity);
    let schema = match load_schema(entity.kind, override_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(entity = %entity.id, error = %e, "schema unavailable");
            let msg = e.to_string();
            state.form = None;
            state.schema_error = Some(msg.clone());
            return vec![toast(msg, ToastLevel::Error)];
        }
    };
    let ctx = FormContext {
        record_id,
        seed: entity.context.clone(),
        default_domain_template: state.config.default_domain_template.clone(),
    };
    let session = FormSession::new(entity.kind, mode, &schema, record.as_ref(), ctx);
    state.schema_error = None;
    state.form = Some(FormWidget::new(entity, session));
    state.focus = Focus::Form;
    Vec::new()
}

#[cfg(test)]
mod tests;
