//! Test utilities for talks-tui.
//!
//! Builds apps around a scripted turn service, drives them step by step and
//! renders them to text.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};
use talks_engine::testing::ScriptedService;
use talks_engine::{Config, ImmediatePacer, TurnService};

use crate::app::App;
use crate::snapshot::buffer_to_string;
use crate::ui;

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Create a test terminal with the default dimensions (80x24).
pub fn create_test_terminal() -> Terminal<TestBackend> {
    create_test_terminal_sized(TEST_WIDTH, TEST_HEIGHT)
}

/// Create a test terminal with custom dimensions.
pub fn create_test_terminal_sized(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("Failed to create test terminal")
}

/// Default config with the given turn ceiling.
pub fn test_config(max_turns: u32) -> Config {
    Config {
        max_turns,
        ..Config::default()
    }
}

/// App over a default scripted service, without pacing delays.
pub fn create_test_app(max_turns: u32) -> (App, Arc<ScriptedService>) {
    create_test_app_with(ScriptedService::new(), test_config(max_turns))
}

/// App over the given scripted service.
pub fn create_test_app_with(service: ScriptedService, config: Config) -> (App, Arc<ScriptedService>) {
    let service = Arc::new(service);
    let app = App::new(
        &config,
        Arc::clone(&service) as Arc<dyn TurnService>,
        Arc::new(ImmediatePacer),
    );
    (app, service)
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Type `text` into the app one key at a time.
pub fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.handle_key(key(KeyCode::Char(c)));
    }
}

pub fn draw(terminal: &mut Terminal<TestBackend>, app: &mut App) {
    terminal
        .draw(|frame| ui::render(frame, app))
        .expect("Failed to draw");
}

/// Apply one conversation completion, then redraw.
pub async fn step(app: &mut App, terminal: &mut Terminal<TestBackend>) -> bool {
    let progressed = app.drive().await;
    app.process_conversation_events();
    draw(terminal, app);
    progressed
}

/// Step until nothing is outstanding.
pub async fn run_to_idle(app: &mut App, terminal: &mut Terminal<TestBackend>) {
    while step(app, terminal).await {}
}

/// Render the app on a fresh terminal and return the screen as text.
pub fn render_app_to_string(app: &mut App, width: u16, height: u16) -> String {
    let mut terminal = create_test_terminal_sized(width, height);
    draw(&mut terminal, app);
    buffer_to_string(terminal.backend().buffer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_terminal() {
        let terminal = create_test_terminal();
        let size = terminal.size().unwrap();
        assert_eq!(size.width, TEST_WIDTH);
        assert_eq!(size.height, TEST_HEIGHT);
    }

    #[test]
    fn test_render_idle_app() {
        let (mut app, _service) = create_test_app(20);
        let screen = render_app_to_string(&mut app, TEST_WIDTH, TEST_HEIGHT);
        assert!(screen.contains("idle"));
        assert!(screen.contains("Conversation"));
        assert!(screen.contains("Enter a topic below"));
        assert!(screen.contains("[Enter] start"));
    }

    #[test]
    fn test_type_text() {
        let (mut app, _service) = create_test_app(20);
        type_text(&mut app, "space travel");
        assert_eq!(app.input.content(), "space travel");
    }
}
