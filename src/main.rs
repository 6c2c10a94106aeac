mod app;
mod engine;
mod logging;
mod model;
mod nav;
mod schema;
mod services;
mod theme;
mod ui;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    // Logging is best effort; the console still works without it.
    match logging::init_tracing() {
        Ok(path) => tracing::info!(log = %path.display(), "admin-tui starting"),
        Err(e) => eprintln!("admin-tui: logging disabled: {e:#}"),
    }
    ui::run()
}
