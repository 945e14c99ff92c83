use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use super::app::App;

/// Handle keyboard events and update app state
pub fn handle_events(app: &mut App) -> anyhow::Result<()> {
    // Poll for events with timeout
    if event::poll(Duration::from_millis(50))? {
        if let Event::Key(key) = event::read()? {
            handle_key_event(app, key);
        }
    }
    Ok(())
}

/// Process individual key press
fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Check for Ctrl+C
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.quit();
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
        }

        // Select channel (vim-style: k=up, j=down)
        KeyCode::Char('k') | KeyCode::Up => {
            app.prev_channel();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.next_channel();
        }

        // Adjust rows (vim-style: h=left, l=right)
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
            app.increase_rows();
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => {
            app.decrease_rows();
        }

        _ => {}
    }
}
