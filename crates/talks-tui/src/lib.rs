//! talks-tui: Terminal UI for paced, turn-by-turn model conversations
//!
//! This crate provides the TUI layer for talks, including:
//! - The conversation pane with scroll-follow
//! - Topic input, status bar and key hints
//! - Text snapshot export of the transcript
//! - Headless mode for testing and automation

mod app;
mod conversation;
mod event;
pub mod headless;
mod snapshot;
#[cfg(test)]
pub mod test_utils;
mod text;
mod theme;
mod ui;
mod widgets;

pub use app::App;
pub use event::{Action, Event, EventHandler};
pub use snapshot::TextSnapshot;
pub use talks_engine;

use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::sync::Arc;
use talks_engine::{Config, HttpTurnService, TokioPacer};
use tracing::info;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI application against the server named in `config`.
///
/// When `topic` is given the conversation starts right away. Sets up the
/// terminal, runs the event loop, and restores the terminal on exit.
pub async fn run_tui(
    config: &Config,
    topic: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = HttpTurnService::new(&config.server_url, config.request_timeout())?;
    let mut app = App::new(config, Arc::new(service), Arc::new(TokioPacer));
    info!(server = %config.server_url, "starting TUI");

    if let Some(topic) = topic {
        app.input.insert_str(topic);
        app.handle_action(Action::Start);
    }

    // Setup terminal with RAII guard for cleanup
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 4 Hz tick rate
    let mut events = EventHandler::new(250);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    // Restore cursor before guard drops
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let busy = app.is_busy();
        tokio::select! {
            event = events.next() => match event {
                Some(Event::Key(key)) => app.handle_key(key),
                Some(Event::Mouse(mouse)) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_wheel(true),
                    MouseEventKind::ScrollDown => app.scroll_wheel(false),
                    _ => {}
                },
                Some(Event::Tick) => app.tick(),
                // Layout is recomputed on the next draw
                Some(Event::Resize(_, _)) => {}
                None => break,
            },
            _ = app.drive(), if busy => {}
        }

        app.process_conversation_events();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Returns the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
