use super::profile::profile;
use super::{
    build_initial_state, reconcile, validate, EntityProfile, FormContext, FormState, FormValue,
    ToastLevel, ValidationErrors,
};
use crate::schema::{visible_sections, EntityKind, FieldSpec, FormSchema, Mode, Section};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// One open create/edit dialog. Submission results carry the instance id
/// they were started for; anything addressed to another instance, or
/// arriving after close, is dropped.
#[derive(Clone, Debug)]
pub struct FormSession {
    pub kind: EntityKind,
    pub mode: Mode,
    pub profile: &'static EntityProfile,
    pub title: String,
    pub sections: Vec<Section>,
    pub leaves: Vec<FieldSpec>,
    pub initial: FormState,
    pub state: FormState,
    pub errors: ValidationErrors,
    pub busy: bool,
    pub submit_error: Option<String>,
    pub instance: u64,
    pub closed: bool,
    pub ctx: FormContext,
}

#[derive(Clone, Debug)]
pub enum FormAction {
    Edit { name: String, value: FormValue },
    ToggleChip { name: String, option: String },
    Submit,
    SubmitSucceeded { instance: u64 },
    SubmitFailed { instance: u64, message: String },
    Reset,
    Close,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormEvent {
    Submit { instance: u64, payload: JsonValue },
    Toast { text: String, level: ToastLevel },
    Closed { instance: u64 },
}

impl FormSession {
    pub fn new(
        kind: EntityKind,
        mode: Mode,
        schema: &FormSchema,
        record: Option<&JsonValue>,
        ctx: FormContext,
    ) -> Self {
        let sections = visible_sections(schema, mode);
        let leaves: Vec<FieldSpec> = sections
            .iter()
            .flat_map(|s| s.fields.iter().cloned())
            .collect();
        let profile = profile(kind);
        let refs: Vec<&FieldSpec> = leaves.iter().collect();
        let initial = build_initial_state(&refs, record, profile, &ctx);
        let verb = match mode {
            Mode::Create => "New",
            Mode::Edit => "Edit",
        };
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = kind.noun(), ?mode, instance, fields = leaves.len(), "form opened");
        Self {
            kind,
            mode,
            profile,
            title: format!("{verb} {}", kind.title()),
            sections,
            leaves,
            state: initial.clone(),
            initial,
            errors: ValidationErrors::default(),
            busy: false,
            submit_error: None,
            instance,
            closed: false,
            ctx,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.leaves.iter().find(|f| f.name == name)
    }

    pub fn is_dirty(&self) -> bool {
        self.state != self.initial
    }

    /// Payload as it would be submitted right now, without validating.
    pub fn payload(&self) -> JsonValue {
        reconcile(&self.state, self.profile, self.mode, &self.ctx)
    }

    fn editable(&self, name: &str) -> Option<&FieldSpec> {
        self.field(name).filter(|f| !f.read_only_in(self.mode))
    }
}

pub fn update(session: &mut FormSession, action: FormAction) -> Vec<FormEvent> {
    use FormAction::*;
    let mut events = Vec::new();
    match action {
        Edit { name, value } => {
            if session.busy || session.closed || session.editable(&name).is_none() {
                return events;
            }
            session.state.set(name.clone(), value);
            session.errors.clear_field(&name);
        }
        ToggleChip { name, option } => {
            if session.busy || session.closed {
                return events;
            }
            match session.editable(&name) {
                Some(f) if f.kind.is_chip() => {}
                _ => return events,
            }
            let mut list = session.state.list(&name);
            if let Some(pos) = list.iter().position(|v| *v == option) {
                list.remove(pos);
            } else {
                list.push(option);
            }
            session.state.set(name.clone(), FormValue::List(list));
            session.errors.clear_field(&name);
        }
        Submit => {
            if session.busy || session.closed {
                return events;
            }
            let refs: Vec<&FieldSpec> = session.leaves.iter().collect();
            session.errors = validate(&refs, &session.state);
            if !session.errors.is_empty() {
                events.push(FormEvent::Toast {
                    text: format!("Please fix {} field(s)", session.errors.len()),
                    level: ToastLevel::Error,
                });
                return events;
            }
            session.busy = true;
            session.submit_error = None;
            let payload = session.payload();
            tracing::info!(
                kind = session.kind.noun(),
                mode = session.mode.verb(),
                instance = session.instance,
                "submitting form"
            );
            events.push(FormEvent::Submit {
                instance: session.instance,
                payload,
            });
        }
        SubmitSucceeded { instance } => {
            if !accepts_result(session, instance) {
                return events;
            }
            session.busy = false;
            session.closed = true;
            events.push(FormEvent::Toast {
                text: format!("{} {}d successfully", session.kind.title(), session.mode.verb()),
                level: ToastLevel::Success,
            });
            events.push(FormEvent::Closed { instance });
        }
        SubmitFailed { instance, message } => {
            if !accepts_result(session, instance) {
                return events;
            }
            session.busy = false;
            tracing::warn!(instance, error = %message, "submission failed");
            session.submit_error = Some(message.clone());
            events.push(FormEvent::Toast {
                text: message,
                level: ToastLevel::Error,
            });
        }
        Reset => {
            if session.busy || session.closed {
                return events;
            }
            session.state = session.initial.clone();
            session.errors.clear();
            session.submit_error = None;
        }
        Close => {
            if session.closed {
                return events;
            }
            session.closed = true;
            events.push(FormEvent::Closed {
                instance: session.instance,
            });
        }
    }
    events
}

fn accepts_result(session: &FormSession, instance: u64) -> bool {
    if instance != session.instance || session.closed || !session.busy {
        tracing::debug!(
            instance,
            current = session.instance,
            closed = session.closed,
            "dropping stale submission result"
        );
        return false;
    }
    true
}
