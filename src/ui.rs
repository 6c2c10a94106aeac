use crate::app::{update, AppMsg, Effect};
use crate::model::{validate_app_config, AppConfig};
use crate::nav::flatten::flatten_nodes;
use crate::nav::keys::entity_key;
use crate::widgets::form_widget::FormWidget;
use crate::widgets::menu::draw_menu;
use crate::widgets::status_bar::draw_footer_combined;
use crate::widgets::Widget;
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

pub use crate::engine::ToastLevel;

const CONFIG_FILE: &str = "admin-index.yaml";

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) config_dir: Option<PathBuf>,
    pub(crate) selected: usize,
    pub(crate) children: HashMap<String, Vec<JsonValue>>,
    pub(crate) expanded: HashSet<String>,
    pub(crate) loading: HashSet<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) schema_error: Option<String>,
    pub(crate) tick: u64,
    pub(crate) tx: Option<Sender<LoadMsg>>,
    pub(crate) rx: Option<Receiver<LoadMsg>>,
    // Left menu viewport (for PgUp/PgDn) and persistent scroll offset
    pub(crate) menu_viewport_h: u16,
    pub(crate) menu_offset: usize,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) focus: Focus,
    pub(crate) form: Option<FormWidget>,
    pub(crate) theme: crate::theme::Theme,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    #[default]
    Menu,
    Form,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Clone, Debug)]
pub(crate) enum FlatNode {
    Entity {
        idx: usize,
    },
    New {
        idx: usize,
        depth: usize,
    },
    Record {
        idx: usize,
        key: String,
        depth: usize,
        val: JsonValue,
    },
}

impl FlatNode {
    pub(crate) fn entity_idx(&self) -> usize {
        match self {
            FlatNode::Entity { idx } | FlatNode::New { idx, .. } | FlatNode::Record { idx, .. } => {
                *idx
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum LoadOutcome {
    Items(Vec<JsonValue>),
    Record { id: String, record: JsonValue },
    Submitted(JsonValue),
}

#[derive(Debug)]
pub(crate) struct LoadMsg {
    pub(crate) key: String,
    pub(crate) outcome: Result<LoadOutcome, String>,
    pub(crate) kind: LoadKind,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum LoadKind {
    List,
    Record,
    Submit { instance: u64 },
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::LoadList { entity, key } => {
                tracing::debug!(%key, cmd = ?entity.list_cmd, "load list");
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_load_list(entity, key, tx.clone());
                }
            }
            Effect::LoadRecord {
                entity,
                id,
                row,
                key,
            } => {
                tracing::debug!(%key, %id, "load record");
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_load_record(entity, id, row, key, tx.clone());
                }
            }
            Effect::Submit {
                entity,
                mode,
                record_id,
                payload,
                instance,
            } => {
                tracing::info!(entity = %entity.id, mode = mode.verb(), instance, "submit");
                state.status_text = Some(format!("Saving {}…", entity.kind.noun()));
                if let Some(tx) = &state.tx {
                    let key = entity_key(&entity);
                    crate::services::loader::spawn_submit(
                        entity,
                        mode,
                        record_id,
                        payload,
                        instance,
                        key,
                        tx.clone(),
                    );
                }
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
            Effect::CopyToClipboard { text } => {
                let copied = arboard::Clipboard::new().and_then(|mut c| c.set_text(text));
                let (text, level) = match copied {
                    Ok(()) => ("Payload copied to clipboard".to_string(), ToastLevel::Success),
                    Err(e) => {
                        tracing::warn!(error = %e, "clipboard unavailable");
                        (format!("Clipboard unavailable: {e}"), ToastLevel::Error)
                    }
                };
                let exp = state.tick.saturating_add(10);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
            Effect::CloseForm { instance } => {
                if state.form.as_ref().map(|f| f.instance()) == Some(instance) {
                    state.form = None;
                    state.focus = Focus::Menu;
                }
            }
        }
    }
}

fn pump_loads(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let key = msg.key;
        let outcome = msg.outcome;
        let effects = match msg.kind {
            LoadKind::List => {
                state.loading.remove(&key);
                update(state, AppMsg::LoadedList { key, outcome })
            }
            LoadKind::Record => {
                state.loading.remove(&key);
                update(state, AppMsg::LoadedRecord { key, outcome })
            }
            LoadKind::Submit { instance } => update(
                state,
                AppMsg::SubmitResult {
                    key,
                    instance,
                    outcome,
                },
            ),
        };
        run_effects(state, effects);
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

/// `ADMIN_TUI_OPEN=<entity id>` expands an entity; `<entity id>/new` opens
/// its create form.
fn headless_open(state: &mut AppState, target: &str) -> bool {
    let (id, new) = match target.strip_suffix("/new") {
        Some(id) => (id, true),
        None => (target, false),
    };
    let Some(idx) = state.config.entities.iter().position(|e| e.id == id) else {
        return false;
    };
    let msg = if new {
        AppMsg::OpenCreate(idx)
    } else {
        AppMsg::ToggleEntity(idx)
    };
    let effs = update(state, msg);
    run_effects(state, effs);
    true
}

pub fn run() -> Result<()> {
    let (cfg, config_dir) = load_config()?;
    tracing::info!(
        dir = %config_dir.display(),
        entities = cfg.entities.len(),
        "config loaded"
    );
    let mut state = AppState {
        config: cfg,
        config_dir: Some(config_dir),
        theme: crate::theme::Theme::synthwave_dark(),
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    if env_flag("ADMIN_TUI_HEADLESS") {
        return run_headless(&mut state);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &mut state)) {
            break Err(e.into());
        }
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    if !handle_key(&mut state, key) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
        pump_loads(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    res
}

fn run_headless(state: &mut AppState) -> Result<()> {
    let ticks: u64 = std::env::var("ADMIN_TUI_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let open_target = std::env::var("ADMIN_TUI_OPEN").ok();
    let backend = ratatui::backend::TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut open_done = false;
    for _ in 0..ticks {
        if !open_done {
            if let Some(target) = &open_target {
                open_done = headless_open(state, target);
            }
        }
        terminal.draw(|f| ui(f, state))?;
        pump_loads(state);
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(tick_rate);
    }
    if env_flag("ADMIN_TUI_SUMMARY") {
        let loaded: usize = state.children.values().map(Vec::len).sum();
        let summary = serde_json::json!({
            "ok": state.last_error.is_none() && state.schema_error.is_none(),
            "entities": state.config.entities.len(),
            "records_loaded": loaded,
            "form_open": state.form.is_some(),
            "form_title": state.form.as_ref().map(|f| f.session.title.clone()),
            "open_done": open_done,
            "schema_error": state.schema_error,
        });
        println!("{summary}");
    }
    Ok(())
}

fn adjust_offset(state: &mut AppState) {
    let ih = state.menu_viewport_h as usize;
    if state.selected < state.menu_offset {
        state.menu_offset = state.selected;
    } else if ih > 0 && state.selected >= state.menu_offset + ih {
        state.menu_offset = state.selected.saturating_sub(ih.saturating_sub(1));
    }
}

/// Route one key press. Returns false when the app should quit.
pub(crate) fn handle_key(state: &mut AppState, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return false;
    }
    if state.focus == Focus::Form {
        if let Some(fw) = state.form.as_mut() {
            if key.code == KeyCode::Left && !fw.is_capturing() {
                state.focus = Focus::Menu;
                return true;
            }
            let effs = fw.on_key(key);
            run_effects(state, effs);
            return true;
        }
        state.focus = Focus::Menu;
    }

    let nodes = flatten_nodes(state);
    let total = nodes.len();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Up => {
            state.selected = state.selected.saturating_sub(1);
            adjust_offset(state);
        }
        KeyCode::Down => {
            if state.selected + 1 < total {
                state.selected += 1;
            }
            adjust_offset(state);
        }
        KeyCode::PageUp => {
            let step = (state.menu_viewport_h as usize).max(1);
            state.selected = state.selected.saturating_sub(step);
            adjust_offset(state);
        }
        KeyCode::PageDown => {
            let step = (state.menu_viewport_h as usize).max(1);
            state.selected = (state.selected + step).min(total.saturating_sub(1));
            adjust_offset(state);
        }
        KeyCode::Home => {
            state.selected = 0;
            adjust_offset(state);
        }
        KeyCode::End => {
            state.selected = total.saturating_sub(1);
            adjust_offset(state);
        }
        KeyCode::Right | KeyCode::Tab => {
            if state.form.is_some() {
                state.focus = Focus::Form;
            }
        }
        KeyCode::Enter => {
            if let Some(node) = nodes.get(state.selected).cloned() {
                let msg = match node {
                    FlatNode::Entity { idx } => AppMsg::ToggleEntity(idx),
                    FlatNode::New { idx, .. } => AppMsg::OpenCreate(idx),
                    FlatNode::Record { idx, key, val, .. } => AppMsg::OpenEdit { idx, key, row: val },
                };
                let effs = update(state, msg);
                run_effects(state, effs);
            }
        }
        KeyCode::Char('r') => {
            if let Some(node) = nodes.get(state.selected) {
                let effs = update(state, AppMsg::RefreshEntity(node.entity_idx()));
                run_effects(state, effs);
            }
        }
        KeyCode::Char('n') => {
            if let Some(node) = nodes.get(state.selected) {
                let idx = node.entity_idx();
                if state.config.entities[idx].create_cmd.is_some() {
                    let effs = update(state, AppMsg::OpenCreate(idx));
                    run_effects(state, effs);
                }
            }
        }
        _ => {}
    }
    true
}

fn read_config(entry: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(entry).with_context(|| format!("reading {entry:?}"))?;
    let cfg: AppConfig =
        serde_yaml::from_str(&s).with_context(|| format!("parsing {entry:?}"))?;
    validate_app_config(&cfg).map_err(|e| anyhow::anyhow!("invalid config {entry:?}: {e}"))?;
    Ok(cfg)
}

fn load_config() -> Result<(AppConfig, PathBuf)> {
    // 1) ADMIN_TUI_CONFIG_DIR wins
    if let Ok(base) = std::env::var("ADMIN_TUI_CONFIG_DIR") {
        let base_dir = PathBuf::from(&base);
        let cfg = read_config(&base_dir.join(CONFIG_FILE))?;
        return Ok((cfg, base_dir));
    }

    // 2) CWD, then CWD/.tui
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = [cwd.join(CONFIG_FILE), cwd.join(".tui").join(CONFIG_FILE)];
    for p in &candidates {
        if p.exists() {
            let base_dir = p.parent().unwrap_or(&cwd).to_path_buf();
            return Ok((read_config(p)?, base_dir));
        }
    }
    // 3) <ancestor>/.tui/admin-index.yaml
    let mut cur = cwd.as_path();
    while let Some(parent) = cur.parent() {
        let p = parent.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            let base_dir = p.parent().unwrap_or(parent).to_path_buf();
            return Ok((read_config(&p)?, base_dir));
        }
        cur = parent;
    }
    // 4) ~/.tui/admin-index.yaml
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            let base_dir = p.parent().unwrap_or(&home).to_path_buf();
            return Ok((read_config(&p)?, base_dir));
        }
    }

    Err(anyhow::anyhow!(
        "No config found. Set ADMIN_TUI_CONFIG_DIR=<dir with {CONFIG_FILE}> or place {CONFIG_FILE} in CWD/.tui and ancestors"
    ))
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }

    let screen = f.area();
    let bg = Block::default().style(Style::default().bg(state.theme.bg));
    f.render_widget(bg, screen);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(screen);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    let total = flatten_nodes(state).len();
    state.selected = state.selected.min(total.saturating_sub(1));
    state.menu_viewport_h = cols[0].height.saturating_sub(2);
    draw_menu(f, cols[0], state);

    let tick = state.tick;
    let form_focused = state.focus == Focus::Form;
    if let Some(fw) = state.form.as_mut() {
        fw.render(f, cols[1], form_focused, tick);
    } else if let Some(err) = &state.schema_error {
        draw_schema_error(f, cols[1], err);
    } else {
        draw_welcome(f, cols[1], state);
    }

    let help_text = match (state.focus, state.form.as_ref()) {
        (Focus::Form, Some(fw)) if fw.is_capturing() => {
            "Enter confirm  Esc back  Ctrl+S save".to_string()
        }
        (Focus::Form, Some(_)) => {
            "↑/↓ field  Enter edit  Ctrl+S save  p payload  Esc cancel  ← menu".to_string()
        }
        _ => "↑/↓ select  Enter open  n new  r refresh  → form  q quit".to_string(),
    };
    draw_footer_combined(f, rows[1], state, &help_text);
}

fn draw_schema_error(f: &mut Frame, area: Rect, err: &str) {
    let block = crate::widgets::chrome::panel_block("Schema unavailable", false);
    let p = Paragraph::new(vec![
        Line::from(Span::styled(err.to_string(), crate::theme::text_error())),
        Line::from(""),
        Line::from(Span::styled(
            "Fix the schema file and reopen the form.",
            crate::theme::text_muted(),
        )),
    ])
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_welcome(f: &mut Frame, area: Rect, state: &AppState) {
    let block = crate::widgets::chrome::panel_block(&state.config.title, false);
    let mut lines = vec![
        Line::from("Select an entity and press Enter to list its records."),
        Line::from("Choose \"+ New\" to create one, or a record to edit it."),
    ];
    if let Some(err) = &state.last_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Last error: {err}"),
            crate::theme::text_error(),
        )));
    }
    let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}
