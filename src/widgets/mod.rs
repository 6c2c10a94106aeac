pub mod chrome;
pub mod form;
pub mod form_widget;
pub mod menu;
pub mod payload_preview;
pub mod status_bar;

use crate::app::Effect;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub trait Widget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64);
    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let _ = key;
        Vec::new()
    }
}
