use crate::app::Effect;
use crate::engine::{update, FormAction, FormEvent, FormSession, FormValue};
use crate::model::EntityConfig;
use crate::schema::{FieldKind, FieldSpec};
use crate::widgets::chrome::centered_rect;
use crate::widgets::form::{draw_form, rows, ConfirmAction, FormView, Row, OPTIONS_VISIBLE};
use crate::widgets::payload_preview::PayloadPreview;
use crate::widgets::Widget;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear};
use tui_textarea::TextArea;

const TOAST_SECONDS: u64 = 3;

/// The create/edit dialog: a [`FormSession`] plus cursor state and the
/// optional textarea and payload overlays.
pub struct FormWidget {
    pub entity: EntityConfig,
    pub session: FormSession,
    pub view: FormView,
    ta: Option<TextArea<'static>>,
    preview: Option<PayloadPreview>,
}

impl FormWidget {
    pub fn new(entity: EntityConfig, session: FormSession) -> Self {
        Self {
            entity,
            session,
            view: FormView::default(),
            ta: None,
            preview: None,
        }
    }

    pub fn instance(&self) -> u64 {
        self.session.instance
    }

    /// True while a key should stay inside the dialog (field editing,
    /// confirmation prompt or an overlay).
    pub fn is_capturing(&self) -> bool {
        self.view.editing || self.view.confirm.is_some() || self.preview.is_some()
    }

    fn selected_field(&self) -> Option<&FieldSpec> {
        self.session.leaves.get(self.view.selected)
    }

    fn row_count(&self) -> usize {
        self.session.leaves.len() + 3
    }

    /// Run one action through the reducer and turn its events into effects.
    pub fn dispatch(&mut self, action: FormAction) -> Vec<Effect> {
        update(&mut self.session, action)
            .into_iter()
            .map(|ev| match ev {
                FormEvent::Submit { instance, payload } => Effect::Submit {
                    entity: self.entity.clone(),
                    mode: self.session.mode,
                    record_id: self.session.ctx.record_id.clone(),
                    payload,
                    instance,
                },
                FormEvent::Toast { text, level } => Effect::ShowToast {
                    text,
                    level,
                    seconds: TOAST_SECONDS,
                },
                FormEvent::Closed { instance } => Effect::CloseForm { instance },
            })
            .collect()
    }

    fn submit(&mut self) -> Vec<Effect> {
        self.view.editing = false;
        self.view.confirm = None;
        self.view.message = None;
        let effects = self.dispatch(FormAction::Submit);
        if !self.session.errors.is_empty() {
            if let Some(first) = self
                .session
                .leaves
                .iter()
                .position(|f| self.session.errors.get(&f.name).is_some())
            {
                self.view.selected = first;
            }
        }
        effects
    }

    fn open_textarea(&mut self, label: &str, text: &str) {
        let mut ta = TextArea::default();
        if !text.is_empty() {
            ta.insert_str(text);
        }
        ta.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Editing: {label} · Ctrl+S Save • Esc Cancel")),
        );
        self.ta = Some(ta);
        self.view.editing = true;
    }

    pub fn commit_textarea(&mut self) -> Vec<Effect> {
        let Some(ta) = self.ta.take() else {
            return Vec::new();
        };
        self.view.editing = false;
        let Some(name) = self.selected_field().map(|f| f.name.clone()) else {
            return Vec::new();
        };
        let text = ta.lines().join("\n");
        self.dispatch(FormAction::Edit {
            name,
            value: FormValue::Text(text),
        })
    }

    fn move_selection(&mut self, down: bool) {
        let last = self.row_count() - 1;
        self.view.selected = if down {
            (self.view.selected + 1).min(last)
        } else {
            self.view.selected.saturating_sub(1)
        };
        self.view.confirm = None;
        self.view.message = None;
    }

    fn move_option(&mut self, down: bool, len: usize) {
        if len == 0 {
            return;
        }
        let cur = &mut self.view.option_cursor;
        *cur = if down { (*cur + 1).min(len - 1) } else { cur.saturating_sub(1) };
        if *cur < self.view.option_offset {
            self.view.option_offset = *cur;
        } else if *cur >= self.view.option_offset + OPTIONS_VISIBLE {
            self.view.option_offset = *cur + 1 - OPTIONS_VISIBLE;
        }
    }

    fn activate(&mut self) -> Vec<Effect> {
        let row = rows(&self.session)
            .get(self.view.selected)
            .copied()
            .map(|r| match r {
                Row::Field(f) => Some(f.clone()),
                Row::Save | Row::Reset | Row::Cancel => None,
            });
        match row {
            Some(Some(field)) => {
                self.begin_edit(&field);
                Vec::new()
            }
            Some(None) => {
                let n = self.session.leaves.len();
                match self.view.selected - n {
                    0 => self.submit(),
                    1 => self.confirm_or(ConfirmAction::Reset),
                    _ => self.confirm_or(ConfirmAction::Cancel),
                }
            }
            None => Vec::new(),
        }
    }

    fn begin_edit(&mut self, field: &FieldSpec) {
        if self.session.busy {
            return;
        }
        if field.read_only_in(self.session.mode) {
            self.view.message = Some(format!("{} is read-only", field.label));
            return;
        }
        self.view.message = None;
        match &field.kind {
            FieldKind::Text | FieldKind::Color => self.view.editing = true,
            FieldKind::TextArea => {
                let text = self.session.state.text(&field.name);
                self.open_textarea(&field.label, &text);
            }
            FieldKind::Select { options } => {
                let current = self.session.state.text(&field.name);
                self.view.option_cursor = options
                    .iter()
                    .position(|o| o.value() == current)
                    .unwrap_or(0);
                self.view.option_offset = self
                    .view
                    .option_cursor
                    .saturating_sub(OPTIONS_VISIBLE - 1);
                self.view.editing = true;
            }
            FieldKind::Chip { .. } => {
                self.view.option_cursor = 0;
                self.view.editing = true;
            }
            FieldKind::Group { .. } | FieldKind::Unknown(_) => {}
        }
    }

    /// Reset and Cancel need a second Enter when there are unsaved edits.
    fn confirm_or(&mut self, action: ConfirmAction) -> Vec<Effect> {
        let dirty = self.session.is_dirty();
        if action == ConfirmAction::Reset && !dirty {
            return Vec::new();
        }
        if dirty && self.view.confirm.as_ref() != Some(&action) {
            self.view.message = Some(match action {
                ConfirmAction::Reset => "Press Enter to confirm Reset • Esc to cancel".into(),
                ConfirmAction::Cancel => "Discard changes? Press Enter to confirm • Esc to stay".into(),
            });
            self.view.confirm = Some(action);
            return Vec::new();
        }
        self.view.confirm = None;
        self.view.message = None;
        match action {
            ConfirmAction::Reset => {
                let mut effects = self.dispatch(FormAction::Reset);
                effects.push(Effect::ShowToast {
                    text: "Form reset".into(),
                    level: crate::ui::ToastLevel::Info,
                    seconds: 2,
                });
                effects
            }
            ConfirmAction::Cancel => self.dispatch(FormAction::Close),
        }
    }

    fn edit_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let Some(field) = self.selected_field().cloned() else {
            self.view.editing = false;
            return Vec::new();
        };
        match &field.kind {
            FieldKind::Text | FieldKind::Color => match key.code {
                KeyCode::Char(c) => {
                    let mut s = self.session.state.text(&field.name);
                    s.push(c);
                    self.dispatch(FormAction::Edit {
                        name: field.name,
                        value: FormValue::Text(s),
                    })
                }
                KeyCode::Backspace => {
                    let mut s = self.session.state.text(&field.name);
                    s.pop();
                    self.dispatch(FormAction::Edit {
                        name: field.name,
                        value: FormValue::Text(s),
                    })
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => {
                    self.view.editing = false;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            FieldKind::Select { options } => match key.code {
                KeyCode::Up => {
                    self.move_option(false, options.len());
                    Vec::new()
                }
                KeyCode::Down => {
                    self.move_option(true, options.len());
                    Vec::new()
                }
                KeyCode::Enter => {
                    self.view.editing = false;
                    match options.get(self.view.option_cursor) {
                        Some(opt) => self.dispatch(FormAction::Edit {
                            name: field.name.clone(),
                            value: FormValue::text(opt.value()),
                        }),
                        None => Vec::new(),
                    }
                }
                KeyCode::Esc => {
                    self.view.editing = false;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            FieldKind::Chip { options } => match key.code {
                KeyCode::Left | KeyCode::Up => {
                    self.move_option(false, options.len());
                    Vec::new()
                }
                KeyCode::Right | KeyCode::Down => {
                    self.move_option(true, options.len());
                    Vec::new()
                }
                KeyCode::Enter | KeyCode::Char(' ') => match options.get(self.view.option_cursor) {
                    Some(opt) => self.dispatch(FormAction::ToggleChip {
                        name: field.name.clone(),
                        option: opt.value().to_string(),
                    }),
                    None => Vec::new(),
                },
                KeyCode::Esc | KeyCode::Tab => {
                    self.view.editing = false;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            FieldKind::TextArea | FieldKind::Group { .. } | FieldKind::Unknown(_) => {
                self.view.editing = false;
                Vec::new()
            }
        }
    }
}

impl Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let cursor_on = tick % 2 == 0 && self.ta.is_none();
        draw_form(f, area, &self.session, &self.view, focused, cursor_on);
        if let Some(ta) = &self.ta {
            let rect = centered_rect(80, 70, area);
            f.render_widget(Clear, rect);
            f.render_widget(ta, rect);
        }
        if let Some(p) = self.preview.as_mut() {
            let rect = centered_rect(80, 80, area);
            p.render(f, rect, true, tick);
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if let Some(p) = self.preview.as_mut() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('p')) {
                self.preview = None;
                return Vec::new();
            }
            return p.on_key(key);
        }

        if let Some(ta) = self.ta.as_mut() {
            match key.code {
                KeyCode::Char('s') if ctrl => return self.commit_textarea(),
                KeyCode::Esc => {
                    self.ta = None;
                    self.view.editing = false;
                }
                _ => {
                    ta.input(key);
                }
            }
            return Vec::new();
        }

        if ctrl && key.code == KeyCode::Char('s') {
            return self.submit();
        }

        if self.view.editing {
            return self.edit_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::BackTab => {
                self.move_selection(false);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Tab => {
                self.move_selection(true);
                Vec::new()
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Esc => {
                if self.view.confirm.take().is_some() {
                    self.view.message = None;
                    Vec::new()
                } else {
                    self.confirm_or(ConfirmAction::Cancel)
                }
            }
            KeyCode::Char('p') => {
                let title = format!("{} payload", self.session.title);
                self.preview = Some(PayloadPreview::new(title, &self.session.payload()));
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}
