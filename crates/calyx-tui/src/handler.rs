use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::{info, warn};

use crate::app::{App, InputMode, Screen};
use crate::tui::{AppEvent, TICK_RATE};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(TICK_RATE),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take the keyboard first
    if app.backend_error.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.backend_error = None;
        }
        return;
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Settings, _) => handle_settings(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_up(),
        KeyCode::Enter => app.choose_model(),
        _ => {}
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('s') => app.screen = Screen::Chat,
        KeyCode::Char('T') => app.toggle_theme(),
        KeyCode::Char('r') => app.refresh_status(),
        KeyCode::Char('m') => app.open_model_picker(),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            if app.input_enabled() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Esc => app.selected_message = None,

        // Message selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('t') => app.toggle_thinking(),
        KeyCode::Char('v') => app.toggle_raw_view(),
        KeyCode::Char('c') => {
            if let Some(text) = app.selected_text() {
                copy_to_clipboard(text);
            }
        }

        // Scrolling
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Char('g') => {
            app.chat_scroll = 0;
            app.follow_bottom = false;
        }
        KeyCode::Char('G') => {
            app.selected_message = None;
            app.follow_bottom = true;
        }

        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('m') => app.open_model_picker(),
        KeyCode::Char('s') => app.screen = Screen::Settings,
        KeyCode::Char('T') => app.toggle_theme(),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            // Typing is ignored while the input is closed
            if app.input_enabled() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.insert(byte_pos, c);
                app.cursor += 1;
            }
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

/// Hand text to the system clipboard on the blocking pool, off the event loop.
fn copy_to_clipboard(text: String) {
    tokio::task::spawn_blocking(move || {
        let chars = text.chars().count();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => info!(chars, "copied message"),
            Err(err) => warn!("copy failed: {}", err),
        }
    });
}
