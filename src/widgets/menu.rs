use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;

use crate::nav::flatten::flatten_nodes;
use crate::nav::keys::entity_key;
use crate::ui::{AppState, FlatNode, Focus};
use crate::widgets::chrome::panel_block;

const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

/// Display title of a listed record: the first non-empty of name, title,
/// label, code, id.
pub fn record_title(val: &JsonValue) -> String {
    for k in ["name", "title", "label", "code", "id"] {
        match val.get(k) {
            Some(JsonValue::String(s)) if !s.is_empty() => return s.clone(),
            Some(JsonValue::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    "(untitled)".to_string()
}

pub fn draw_menu(f: &mut Frame, area: Rect, state: &AppState) {
    let nodes = flatten_nodes(state);
    // Offset is kept in range by the key handlers in ui.rs
    let inner_h = area.height.saturating_sub(2);
    let total = nodes.len();
    let ih = inner_h as usize;
    let max_start = total.saturating_sub(ih);
    let start = state.menu_offset.min(max_start);
    let end = (start + ih).min(total);
    let items: Vec<ListItem> = nodes
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(i, node)| {
            let sel = if i == state.selected { "> " } else { "  " };
            match node {
                FlatNode::Entity { idx } => {
                    let e = &state.config.entities[*idx];
                    let key = entity_key(e);
                    let chevron = if state.expanded.contains(&key) { "▾" } else { "▸" };
                    let text = if state.loading.contains(&key) {
                        let spinner = SPINNER[state.tick as usize % 6];
                        format!("{sel}{chevron} {} ({spinner} loading)", e.title)
                    } else if let Some(rows) = state.children.get(&key) {
                        format!("{sel}{chevron} {} ({})", e.title, rows.len())
                    } else {
                        format!("{sel}{chevron} {}", e.title)
                    };
                    ListItem::new(text).style(Style::default().fg(Color::Yellow))
                }
                FlatNode::New { idx, depth } => {
                    let e = &state.config.entities[*idx];
                    let indent = "  ".repeat(*depth);
                    ListItem::new(format!("{sel}{indent}+ New {}", e.kind.title()))
                        .style(Style::default().fg(crate::theme::ACTIVE))
                }
                FlatNode::Record { key, val, depth, .. } => {
                    let indent = "  ".repeat(*depth);
                    let title = record_title(val);
                    if state.loading.contains(key) {
                        let spinner = SPINNER[state.tick as usize % 6];
                        ListItem::new(format!("{sel}{indent}• {title} ({spinner})"))
                    } else {
                        ListItem::new(format!("{sel}{indent}• {title}"))
                    }
                }
            }
        })
        .collect();
    let block = panel_block(&state.config.title, state.focus == Focus::Menu);
    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
