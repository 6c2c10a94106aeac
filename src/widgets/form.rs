use crate::engine::{FormSession, FormValue};
use crate::schema::{FieldKind, FieldSpec, Mode};
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;

pub const OPTIONS_VISIBLE: usize = 8;
const TEXTAREA_FOLD: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    Reset,
    Cancel,
}

/// Cursor and editing state of the dialog. Field values live in the
/// session; this only tracks where the user is.
#[derive(Clone, Debug, Default)]
pub struct FormView {
    pub selected: usize,
    pub editing: bool,
    pub option_cursor: usize,
    pub option_offset: usize,
    pub confirm: Option<ConfirmAction>,
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Row<'a> {
    Field(&'a FieldSpec),
    Save,
    Reset,
    Cancel,
}

/// Rows in navigation order: every visible leaf, then the buttons.
pub fn rows(session: &FormSession) -> Vec<Row<'_>> {
    session
        .leaves
        .iter()
        .map(Row::Field)
        .chain([Row::Save, Row::Reset, Row::Cancel])
        .collect()
}

pub struct FieldRender {
    pub selected: bool,
    pub editing: bool,
    pub cursor_on: bool,
    pub read_only: bool,
    pub option_cursor: usize,
    pub option_offset: usize,
}

fn value_style(r: &FieldRender) -> Style {
    if r.selected && r.editing {
        crate::theme::text_editing_bold()
    } else if r.selected {
        crate::theme::text_active_bold()
    } else {
        Style::default()
    }
}

fn prefix(field: &FieldSpec, r: &FieldRender) -> String {
    let sel = if r.selected { '›' } else { ' ' };
    let req = if field.validators.required { " *" } else { "" };
    format!("{sel} {}{req}: ", field.label)
}

fn placeholder_span(field: &FieldSpec) -> Span<'static> {
    Span::styled(
        field.placeholder.clone().unwrap_or_default(),
        crate::theme::text_muted(),
    )
}

/// Lines for one control. Every kind is handled here; groups never reach
/// this point after flattening and unknown kinds render nothing.
pub fn field_lines(field: &FieldSpec, value: Option<&FormValue>, r: &FieldRender) -> Vec<Line<'static>> {
    let text = value.map(FormValue::as_text).unwrap_or_default();
    let mut lines: Vec<Line<'static>> = Vec::new();
    let ro = if r.read_only {
        Span::styled(" (read-only)", crate::theme::text_muted())
    } else {
        Span::raw("")
    };
    match &field.kind {
        FieldKind::Text => {
            let mut spans = vec![Span::raw(prefix(field, r))];
            if text.is_empty() && !(r.editing && r.selected) {
                spans.push(placeholder_span(field));
            } else {
                let mut shown = text.clone();
                if r.editing && r.selected && r.cursor_on {
                    shown.push('▏');
                }
                spans.push(Span::styled(shown, value_style(r)));
            }
            spans.push(ro);
            lines.push(Line::from(spans));
        }
        FieldKind::TextArea => {
            let sel = if r.selected { '›' } else { ' ' };
            let req = if field.validators.required { " *" } else { "" };
            lines.push(Line::from(vec![
                Span::raw(format!("{sel} {}{req}:", field.label)),
                ro,
            ]));
            if text.is_empty() {
                lines.push(Line::from(vec![Span::raw("  "), placeholder_span(field)]));
            } else {
                let body: Vec<&str> = text.lines().collect();
                for bl in body.iter().take(TEXTAREA_FOLD) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(bl.to_string(), value_style(r)),
                    ]));
                }
                if body.len() > TEXTAREA_FOLD {
                    let more = body.len() - TEXTAREA_FOLD;
                    lines.push(Line::from(Span::styled(
                        format!("  … ({} more line{})", more, if more == 1 { "" } else { "s" }),
                        crate::theme::text_muted(),
                    )));
                }
            }
        }
        FieldKind::Color => {
            let mut spans = vec![Span::raw(prefix(field, r))];
            if text.is_empty() && !(r.editing && r.selected) {
                spans.push(Span::styled("No color selected", crate::theme::text_muted()));
            } else {
                if let Ok(c) = text.trim().parse::<Color>() {
                    spans.push(Span::styled("██ ", Style::default().fg(c)));
                }
                let mut shown = text.clone();
                if r.editing && r.selected && r.cursor_on {
                    shown.push('▏');
                }
                spans.push(Span::styled(shown, value_style(r)));
            }
            spans.push(ro);
            lines.push(Line::from(spans));
        }
        FieldKind::Select { options } => {
            let summary = options
                .iter()
                .find(|o| o.value() == text)
                .map(|o| o.label().to_string())
                .unwrap_or_else(|| if text.is_empty() { "(none)".into() } else { text.clone() });
            lines.push(Line::from(vec![
                Span::raw(prefix(field, r)),
                Span::styled(summary, value_style(r)),
                ro,
            ]));
            if r.editing && r.selected {
                let start = r.option_offset.min(options.len());
                let end = (start + OPTIONS_VISIBLE).min(options.len());
                for (oi, opt) in options.iter().enumerate().take(end).skip(start) {
                    let mark = if opt.value() == text { "(•)" } else { "( )" };
                    let cur = if oi == r.option_cursor { '›' } else { ' ' };
                    let st = if oi == r.option_cursor {
                        crate::theme::list_cursor_style()
                    } else {
                        crate::theme::text_muted()
                    };
                    lines.push(Line::from(Span::styled(
                        format!("  {cur} {mark} {}", opt.label()),
                        st,
                    )));
                }
            }
        }
        FieldKind::Chip { options } => {
            let chosen: Vec<String> = match value {
                Some(FormValue::List(v)) => v.clone(),
                _ => Vec::new(),
            };
            let mut spans = vec![Span::raw(prefix(field, r))];
            if options.is_empty() {
                spans.push(Span::styled("(no options)", crate::theme::text_muted()));
            }
            for (oi, opt) in options.iter().enumerate() {
                let on = chosen.iter().any(|c| c == opt.value());
                let mut st = if on {
                    crate::theme::text_active_bold()
                } else {
                    crate::theme::text_muted()
                };
                if r.editing && r.selected && oi == r.option_cursor {
                    st = crate::theme::list_cursor_style();
                }
                let mark = if on { "✓ " } else { "" };
                spans.push(Span::styled(format!("[{mark}{}]", opt.label()), st));
                spans.push(Span::raw(" "));
            }
            spans.push(ro);
            lines.push(Line::from(spans));
        }
        FieldKind::Group { .. } | FieldKind::Unknown(_) => {}
    }
    lines
}

/// Build the dialog body. Returns the lines and the index of the line
/// holding the selected row, used to keep it scrolled into view.
pub fn form_lines(session: &FormSession, view: &FormView, cursor_on: bool) -> (Vec<Line<'static>>, usize) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_line = 0;
    let mut i = 0;
    for section in &session.sections {
        if let Some(label) = &section.label {
            lines.push(Line::from(Span::styled(
                format!("-- {label} --"),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        for fld in &section.fields {
            let r = FieldRender {
                selected: i == view.selected,
                editing: view.editing,
                cursor_on,
                read_only: fld.read_only_in(session.mode),
                option_cursor: view.option_cursor,
                option_offset: view.option_offset,
            };
            if r.selected {
                selected_line = lines.len();
            }
            lines.extend(field_lines(fld, session.state.get(&fld.name), &r));
            if let Some(err) = session.errors.get(&fld.name) {
                lines.push(Line::from(Span::styled(
                    format!("  ! {err}"),
                    crate::theme::text_error(),
                )));
            }
            if let Some(hint) = field_hint(session, fld) {
                lines.push(Line::from(Span::styled(
                    format!("  {hint}"),
                    crate::theme::text_muted(),
                )));
            }
            i += 1;
        }
    }

    // Buttons: Save | Reset | Cancel
    if !session.leaves.is_empty() {
        lines.push(Line::from(""));
    }
    let n = session.leaves.len();
    let can_save = !session.busy;
    let can_reset = session.is_dirty() && !session.busy;
    let save_label = if session.busy { "[ Saving… ]" } else { "[ Save ]" };
    let mut save_style = if can_save {
        crate::theme::text_active_bold()
    } else {
        crate::theme::text_muted()
    };
    let mut reset_style = if can_reset {
        Style::default().fg(crate::theme::ACTIVE)
    } else {
        crate::theme::text_muted()
    };
    let mut cancel_style = crate::theme::text_muted();
    if view.selected == n {
        save_style = if can_save {
            crate::theme::list_cursor_style()
        } else {
            Style::default()
                .fg(crate::theme::MUTED)
                .bg(crate::theme::ACCENT)
        };
    }
    if view.selected == n + 1 {
        reset_style = crate::theme::list_cursor_style();
    }
    if view.selected == n + 2 {
        cancel_style = crate::theme::list_cursor_style();
    }
    if view.selected >= n {
        selected_line = lines.len();
    }
    lines.push(Line::from(vec![
        Span::styled(format!("  {save_label}  "), save_style),
        Span::styled("Reset  ", reset_style),
        Span::styled("Cancel", cancel_style),
    ]));
    if let Some(err) = &session.submit_error {
        lines.push(Line::from(Span::styled(
            format!("  ! {err}"),
            crate::theme::text_error(),
        )));
    }
    if let Some(msg) = &view.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    (lines, selected_line)
}

fn field_hint(session: &FormSession, fld: &FieldSpec) -> Option<&'static str> {
    if session.mode != Mode::Create || !fld.name.starts_with("domain") {
        return None;
    }
    if session.profile.default_domain {
        Some("Leave empty to use the default domain for this code")
    } else {
        Some("Separate multiple domains with commas")
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    session: &FormSession,
    view: &FormView,
    highlight: bool,
    cursor_on: bool,
) {
    let (lines, selected_line) = form_lines(session, view, cursor_on);
    let inner_h = area.height.saturating_sub(2) as usize;
    // Keep the selected row (and an open option list below it) on screen.
    let keep_below = if view.editing { OPTIONS_VISIBLE + 1 } else { 2 };
    let scroll = (selected_line + keep_below.min(inner_h)).saturating_sub(inner_h);
    let title = if view.editing {
        format!("{} · editing", session.title)
    } else {
        session.title.clone()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    f.render_widget(p, area);
}
