use crate::app::Effect;
use crate::widgets::chrome::panel_block;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SynStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

/// Read-only view of the payload the form would submit right now.
pub struct PayloadPreview {
    title: String,
    text: String,
    lines: Vec<Line<'static>>,
    scroll_y: u16,
    last_viewport_h: u16,
}

impl PayloadPreview {
    pub fn new(title: impl Into<String>, payload: &JsonValue) -> Self {
        let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        let lines = highlight_json(&text);
        Self {
            title: title.into(),
            text,
            lines,
            scroll_y: 0,
            last_viewport_h: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
static THEME: OnceLock<Theme> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme() -> &'static Theme {
    THEME.get_or_init(|| {
        let ts = THEME_SET.get_or_init(ThemeSet::load_defaults);
        ts.themes
            .get("base16-ocean.dark")
            .cloned()
            .unwrap_or_else(|| ts.themes.values().next().cloned().unwrap_or_default())
    })
}

fn highlight_json(text: &str) -> Vec<Line<'static>> {
    let ps = get_syntax_set();
    let syn = ps
        .find_syntax_by_token("json")
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut high = HighlightLines::new(syn, get_theme());
    let mut out: Vec<Line<'static>> = Vec::new();
    for line in text.split('\n') {
        let regions: Vec<(SynStyle, &str)> = high.highlight_line(line, ps).unwrap_or_default();
        if regions.is_empty() {
            out.push(Line::raw(line.to_string()));
            continue;
        }
        let spans: Vec<Span<'static>> = regions
            .into_iter()
            .map(|(st, seg)| {
                let c = st.foreground;
                let mut style = Style::default().fg(Color::Rgb(c.r, c.g, c.b));
                if st.font_style.contains(FontStyle::BOLD) {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Span::styled(seg.to_string(), style)
            })
            .collect();
        out.push(Line::from(spans));
    }
    out
}

impl crate::widgets::Widget for PayloadPreview {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        self.last_viewport_h = area.height.saturating_sub(2);
        let max_scroll = (self.lines.len() as u16).saturating_sub(self.last_viewport_h);
        self.scroll_y = self.scroll_y.min(max_scroll);
        let title = format!("{} · y copy · Esc close", self.title);
        let p = Paragraph::new(self.lines.clone())
            .block(panel_block(&title, focused))
            .scroll((self.scroll_y, 0));
        f.render_widget(Clear, area);
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Up => self.scroll_y = self.scroll_y.saturating_sub(1),
            KeyCode::Down => self.scroll_y = self.scroll_y.saturating_add(1),
            KeyCode::PageUp => self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h),
            KeyCode::PageDown => self.scroll_y = self.scroll_y.saturating_add(self.last_viewport_h),
            KeyCode::Home => self.scroll_y = 0,
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                return vec![Effect::CopyToClipboard {
                    text: self.text().to_string(),
                }];
            }
            _ => {}
        }
        Vec::new()
    }
}
