//! Headless mode for the talks TUI.
//!
//! Runs the full app against a `TestBackend` instead of a real terminal,
//! for E2E testing and automation. Input is sent over a channel and the
//! rendered screen is published after every draw.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};
use talks_engine::{Config, Pacer, RunStatus, TurnService};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::app::App;
use crate::event::Action;
use crate::snapshot::buffer_to_string;
use crate::ui;

/// Default terminal dimensions for headless mode.
pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

/// State captured from the headless TUI after each render.
#[derive(Debug, Clone, Default)]
pub struct HeadlessState {
    /// Text contents of the terminal buffer.
    pub screen_contents: String,
    pub status: RunStatus,
    pub turn_count: u32,
    /// Messages in the transcript.
    pub messages: usize,
    /// Whether the pending indicator is visible.
    pub pending: bool,
    pub alert: Option<String>,
    pub notification: Option<String>,
    pub show_help: bool,
    /// Whether the TUI should quit.
    pub should_quit: bool,
}

#[derive(Debug, Clone)]
enum Input {
    Key(KeyEvent),
    Action(Action),
}

/// Handle to control a headless TUI instance.
pub struct HeadlessHandle {
    input_tx: mpsc::UnboundedSender<Input>,
    state_rx: watch::Receiver<HeadlessState>,
}

impl HeadlessHandle {
    /// Send a key press. Returns `true` if the TUI is still listening.
    pub fn send_key(&self, key: KeyEvent) -> bool {
        self.input_tx.send(Input::Key(key)).is_ok()
    }

    /// Send an action, bypassing key mapping.
    pub fn send_action(&self, action: Action) -> bool {
        self.input_tx.send(Input::Action(action)).is_ok()
    }

    /// Type `text` into the topic input.
    pub fn type_text(&self, text: &str) -> bool {
        text.chars().all(|c| {
            self.send_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
        })
    }

    /// Get the current state of the TUI.
    pub fn state(&self) -> HeadlessState {
        self.state_rx.borrow().clone()
    }

    /// Wait until a condition is met on the state.
    ///
    /// Returns the state when the condition is met, or `None` if timed out.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<HeadlessState>
    where
        F: Fn(&HeadlessState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self.state();
            if condition(&state) {
                return Some(state);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, self.state_rx.changed()).await {
                Ok(Ok(())) => {}
                // Timed out, or the TUI task ended
                _ => return None,
            }
        }
    }

    /// Wait for specific text to appear on screen.
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<HeadlessState> {
        self.wait_for(|s| s.screen_contents.contains(text), timeout)
            .await
    }

    /// Wait for a run status.
    pub async fn wait_for_status(
        &mut self,
        status: RunStatus,
        timeout: Duration,
    ) -> Option<HeadlessState> {
        self.wait_for(|s| s.status == status, timeout).await
    }

    /// Check if the TUI has quit.
    pub fn has_quit(&self) -> bool {
        self.state().should_quit
    }
}

/// Configuration for headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub width: u16,
    pub height: u16,
    /// Tick rate in milliseconds.
    pub tick_rate_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_rate_ms: 50,
        }
    }
}

/// Run the TUI in headless mode.
///
/// Returns a handle to control the TUI and a join handle for the background task.
///
/// # Example
///
/// ```ignore
/// let (mut handle, task) = run_tui_headless(&config, service, pacer, HeadlessConfig::default());
///
/// handle.type_text("space travel");
/// handle.send_action(Action::Start);
/// handle.wait_for_status(RunStatus::Completed, Duration::from_secs(5)).await;
///
/// handle.send_action(Action::Quit);
/// task.await.unwrap();
/// ```
pub fn run_tui_headless(
    config: &Config,
    service: Arc<dyn TurnService>,
    pacer: Arc<dyn Pacer>,
    headless: HeadlessConfig,
) -> (HeadlessHandle, JoinHandle<Result<(), String>>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(HeadlessState::default());

    let app = App::new(config, service, pacer);
    let task = tokio::spawn(async move {
        run_headless_loop(app, headless, input_rx, state_tx)
            .await
            .map_err(|e| e.to_string())
    });

    let handle = HeadlessHandle { input_tx, state_rx };
    (handle, task)
}

async fn run_headless_loop(
    mut app: App,
    config: HeadlessConfig,
    mut input_rx: mpsc::UnboundedReceiver<Input>,
    state_tx: watch::Sender<HeadlessState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let backend = TestBackend::new(config.width, config.height);
    let mut terminal = Terminal::new(backend)?;
    let tick_duration = Duration::from_millis(config.tick_rate_ms);

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        let controller = app.controller();
        let _ = state_tx.send(HeadlessState {
            screen_contents: buffer_to_string(terminal.backend().buffer()),
            status: controller.status(),
            turn_count: controller.turn_count(),
            messages: controller.transcript().len(),
            pending: controller.is_pending(),
            alert: app.alert.clone(),
            notification: app.notification.clone(),
            show_help: app.show_help,
            should_quit: app.should_quit,
        });

        if app.should_quit {
            break;
        }

        let busy = app.is_busy();
        tokio::select! {
            input = input_rx.recv() => match input {
                Some(Input::Key(key)) => app.handle_key(key),
                Some(Input::Action(action)) => app.handle_action(action),
                None => break,
            },
            _ = app.drive(), if busy => {}
            () = tokio::time::sleep(tick_duration) => app.tick(),
        }

        app.process_conversation_events();
    }

    Ok(())
}
