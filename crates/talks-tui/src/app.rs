//! Application state and update logic for the talks TUI.

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use talks_engine::{
    CaptureOptions, Config, ControllerOptions, ConversationController, ConversationEvent, Pacer,
    RunStatus, ScrollPolicy, TurnService,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::conversation::{TranscriptView, SCROLL_SPEED};
use crate::event::{key_to_action, Action};
use crate::snapshot::TextSnapshot;
use crate::theme::Theme;
use crate::widgets::{StatusBarContent, TopicInputState};

/// Ticks a notification stays visible (3 s at 4 Hz).
const NOTIFICATION_TICKS: usize = 12;

/// Application state.
#[derive(Debug)]
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    /// Error waiting to be acknowledged.
    pub alert: Option<String>,

    /// Notification message (cleared after some ticks).
    pub notification: Option<String>,
    notification_ttl: usize,

    /// Tick counter for animations.
    pub tick: usize,

    /// Topic being typed.
    pub input: TopicInputState,

    /// Scroll state of the transcript.
    pub view: TranscriptView,

    pub theme: Theme,

    /// Width of the conversation region at the last draw.
    pub(crate) capture_width: u16,

    controller: ConversationController,
    event_rx: mpsc::UnboundedReceiver<ConversationEvent>,
    policy: ScrollPolicy,
    export_dir: PathBuf,
    server: String,
}

impl App {
    /// Create the app around a turn service and pacer.
    pub fn new(config: &Config, service: Arc<dyn TurnService>, pacer: Arc<dyn Pacer>) -> Self {
        let (controller, event_rx) =
            ConversationController::new(service, pacer, ControllerOptions::from(config));
        Self {
            should_quit: false,
            show_help: false,
            alert: None,
            notification: None,
            notification_ttl: 0,
            tick: 0,
            input: TopicInputState::new(),
            view: TranscriptView::new(),
            theme: Theme::default(),
            capture_width: 0,
            controller,
            event_rx,
            policy: ScrollPolicy::new(config.scroll_threshold),
            export_dir: config.export_dir.clone(),
            server: config.server_url.clone(),
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    /// Whether the conversation has outstanding work to drive.
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Wait for the next conversation completion. Cancel safe.
    pub async fn drive(&mut self) -> bool {
        self.controller.next_event().await
    }

    /// The topic input accepts text only while a run may be started.
    pub fn input_enabled(&self) -> bool {
        self.controller.can_start()
    }

    pub fn input_placeholder(&self) -> &'static str {
        match self.controller.status() {
            RunStatus::Running => "conversation running, Ctrl+P to pause",
            RunStatus::Completed => "conversation finished, Ctrl+R to clear",
            RunStatus::Idle | RunStatus::Paused | RunStatus::Failed => {
                "enter a topic and press Enter"
            }
        }
    }

    pub fn status_content(&self) -> StatusBarContent {
        StatusBarContent {
            status: self.controller.status(),
            topic: self.controller.topic().map(str::to_string),
            turn: self.controller.turn_count(),
            max_turns: self.controller.max_turns(),
            server: self.server.clone(),
            following: self.view.is_at_bottom(),
        }
    }

    /// Handle a key press.
    ///
    /// Printable keys edit the topic while the input is enabled; everything
    /// else goes through [`key_to_action`].
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.alert.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.alert = None,
                _ if key_to_action(key) == Action::Quit => self.should_quit = true,
                _ => {}
            }
            return;
        }
        if self.edit_input(key) {
            return;
        }
        self.handle_action(key_to_action(key));
    }

    /// Returns true if the key was consumed by the topic input.
    fn edit_input(&mut self, key: KeyEvent) -> bool {
        if self.show_help || !self.input_enabled() {
            return false;
        }
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }
        match key.code {
            KeyCode::Char(c) => self.input.insert(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            _ => return false,
        }
        true
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
            }
            Action::Help => self.show_help = !self.show_help,
            Action::Back => {
                if self.alert.take().is_some() {
                    return;
                }
                if self.show_help {
                    self.show_help = false;
                } else if self.input_enabled() {
                    self.input.clear();
                }
            }
            Action::Start => self.start_conversation(),
            Action::Pause => self.pause_conversation(),
            Action::Reset => self.reset_conversation(),
            Action::Export => self.export_snapshot(),
            Action::ScrollUp => self.view.scroll_up(1),
            Action::ScrollDown => self.view.scroll_down(1),
            Action::PageUp => self.view.page_up(),
            Action::PageDown => self.view.page_down(),
            Action::Top => self.view.jump_to_top(),
            Action::Bottom => self.view.jump_to_bottom(),
            Action::None => {}
        }
    }

    /// Mouse wheel scrolling.
    pub fn scroll_wheel(&mut self, up: bool) {
        if up {
            self.view.scroll_up(SCROLL_SPEED);
        } else {
            self.view.scroll_down(SCROLL_SPEED);
        }
    }

    fn start_conversation(&mut self) {
        if self.show_help {
            return;
        }
        if !self.input_enabled() {
            if self.controller.status() == RunStatus::Completed {
                self.set_notification("Conversation finished. Press Ctrl+R to clear.".into());
            }
            return;
        }

        let topic = self.input.content().trim().to_string();
        if topic.is_empty() {
            self.set_notification("Enter a topic first".into());
            return;
        }
        if self.controller.start(&topic) {
            self.notification = None;
        }
    }

    fn pause_conversation(&mut self) {
        if self.controller.pause() {
            self.set_notification("Paused. A turn already requested will still arrive.".into());
        }
    }

    fn reset_conversation(&mut self) {
        self.controller.reset();
        self.view.reset();
        self.alert = None;
        self.set_notification("Conversation cleared".into());
    }

    fn export_snapshot(&mut self) {
        let renderer = TextSnapshot::new(self.theme.clone());
        let width = if self.capture_width == 0 {
            CaptureOptions::default().width
        } else {
            self.capture_width
        };
        let options = CaptureOptions {
            width,
            title: self.controller.topic().map(str::to_string),
        };
        match self
            .controller
            .export(&renderer, &options, &self.export_dir)
        {
            Ok(path) => self.set_notification(format!("Saved {}", path.display())),
            Err(e) => self.alert = Some(format!("Export failed: {e}")),
        }
    }

    /// Apply every conversation event received since the last call.
    pub fn process_conversation_events(&mut self) {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        for event in events {
            self.handle_conversation_event(event);
        }
    }

    fn handle_conversation_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::Started { topic, generation } => {
                debug!(%topic, generation, "run started");
                self.view.reset();
            }
            ConversationEvent::MessageAppended { turn_count, .. } => {
                self.follow_if_near_bottom(turn_count);
            }
            ConversationEvent::PendingChanged(true) => {
                self.follow_if_near_bottom(self.controller.turn_count());
            }
            ConversationEvent::Completed { turns } => {
                self.set_notification(format!("Conversation finished after {turns} turns"));
            }
            ConversationEvent::Failed(failure) => {
                self.alert = Some(failure.to_string());
            }
            ConversationEvent::ResetFailed(error) => {
                self.set_notification(format!("Server reset failed: {error}"));
            }
            ConversationEvent::PendingChanged(false)
            | ConversationEvent::StatusChanged(_)
            | ConversationEvent::Reset => {}
        }
    }

    /// Reveal new content unless the reader has scrolled away from it.
    fn follow_if_near_bottom(&mut self, turn_count: u32) {
        if self.policy.should_reveal(&self.view.viewport(), turn_count) {
            self.view.reveal_latest();
        }
    }

    /// Set a temporary notification message.
    fn set_notification(&mut self, msg: String) {
        info!(notification = %msg);
        self.notification = Some(msg);
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    /// Update tick-based state.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use talks_engine::testing::{ScriptedService, ScriptedTurn};

    #[tokio::test]
    async fn test_start_requires_topic() {
        let (mut app, service) = create_test_app(3);
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Enter));

        assert!(!app.is_busy());
        assert_eq!(service.initialize_calls(), 0);
        assert_eq!(app.notification.as_deref(), Some("Enter a topic first"));
    }

    #[tokio::test]
    async fn test_full_run_renders_transcript() {
        let (mut app, service) = create_test_app(3);
        let mut terminal = create_test_terminal();

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        run_to_idle(&mut app, &mut terminal).await;

        assert_eq!(app.controller().status(), RunStatus::Completed);
        assert_eq!(app.controller().transcript().len(), 4);
        assert_eq!(service.topics(), vec!["space travel"]);

        let screen = render_app_to_string(&mut app, TEST_WIDTH, 40);
        let pane_top = screen.lines().nth(1).unwrap();
        assert!(pane_top.contains(" space travel "));
        assert!(screen.contains("Moderator (System)"));
        assert!(screen.contains("Topic: space travel"));
        assert!(screen.contains("Model B"));
        assert!(screen.contains("turn 3/3"));
        assert!(screen.contains("finished after 3 turns"));

        // Needs a reset before the next run
        assert!(!app.input_enabled());
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(service.initialize_calls(), 1);
    }

    #[tokio::test]
    async fn test_typing_ignored_while_running() {
        let (mut app, _service) = create_test_app(5);
        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));

        type_text(&mut app, "xyz");
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.input.content(), "space travel");
    }

    #[tokio::test]
    async fn test_pause_then_restart() {
        let (mut app, service) = create_test_app(20);
        let mut terminal = create_test_terminal();

        type_text(&mut app, "first");
        app.handle_key(key(KeyCode::Enter));
        step(&mut app, &mut terminal).await;
        app.handle_key(ctrl('p'));
        run_to_idle(&mut app, &mut terminal).await;

        assert_eq!(app.controller().status(), RunStatus::Paused);
        assert_eq!(app.controller().turn_count(), 1);
        assert!(app.input_enabled());

        app.input.clear();
        type_text(&mut app, "second");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.controller().status(), RunStatus::Running);
        assert_eq!(app.controller().turn_count(), 0);
        step(&mut app, &mut terminal).await;
        assert_eq!(service.topics(), vec!["first", "second"]);
        assert_eq!(
            app.controller().transcript().get(0).unwrap().text,
            "Topic: second"
        );
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (mut app, service) = create_test_app(2);
        let mut terminal = create_test_terminal();

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        run_to_idle(&mut app, &mut terminal).await;

        app.handle_key(ctrl('r'));
        assert!(app.controller().transcript().is_empty());
        assert_eq!(app.controller().status(), RunStatus::Idle);
        assert!(app.input_enabled());
        assert_eq!(app.notification.as_deref(), Some("Conversation cleared"));

        run_to_idle(&mut app, &mut terminal).await;
        assert_eq!(service.reset_calls(), 1);
    }

    #[tokio::test]
    async fn test_turn_failure_shows_alert() {
        let service = ScriptedService::new().with_turns([
            ScriptedTurn::Message(talks_engine::Message::new("Model A", "one")),
            ScriptedTurn::Error("rate limited".into()),
        ]);
        let (mut app, _service) = create_test_app_with(service, test_config(20));
        let mut terminal = create_test_terminal();

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        run_to_idle(&mut app, &mut terminal).await;

        assert_eq!(app.controller().status(), RunStatus::Failed);
        assert_eq!(app.alert.as_deref(), Some("turn rejected: rate limited"));
        let screen = render_app_to_string(&mut app, TEST_WIDTH, TEST_HEIGHT);
        assert!(screen.contains("rate limited"));

        // Keys other than dismiss are swallowed by the alert
        app.handle_key(key(KeyCode::Char('x')));
        assert!(app.alert.is_some());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.alert.is_none());

        // A failed run can be restarted
        assert!(app.input_enabled());
    }

    #[tokio::test]
    async fn test_initialization_failure_shows_alert() {
        let service = ScriptedService::new().failing_initialize("connection refused");
        let (mut app, _service) = create_test_app_with(service, test_config(20));
        let mut terminal = create_test_terminal();

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        run_to_idle(&mut app, &mut terminal).await;

        assert_eq!(app.controller().status(), RunStatus::Idle);
        let alert = app.alert.clone().unwrap();
        assert!(alert.starts_with("failed to start conversation"));
        assert!(alert.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_autoscroll_follows_reader_at_bottom() {
        let (mut app, _service) = create_test_app(20);
        let mut terminal = create_test_terminal_sized(60, 14);

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        draw(&mut terminal, &mut app);
        while app.controller().turn_count() < 6 {
            step(&mut app, &mut terminal).await;
        }
        assert!(app.view.scroll_position() > 0);
        assert!(app.view.is_at_bottom());

        for _ in 0..4 {
            step(&mut app, &mut terminal).await;
        }
        assert!(app.view.is_at_bottom());
    }

    #[tokio::test]
    async fn test_scrolled_reader_is_left_alone() {
        let (mut app, _service) = create_test_app(20);
        let mut terminal = create_test_terminal_sized(60, 14);

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        draw(&mut terminal, &mut app);
        while app.controller().turn_count() < 6 {
            step(&mut app, &mut terminal).await;
        }

        app.handle_key(key(KeyCode::PageUp));
        app.handle_key(key(KeyCode::PageUp));
        draw(&mut terminal, &mut app);
        let position = app.view.scroll_position();
        assert!(app.view.viewport().distance_from_bottom() > 4);

        for _ in 0..4 {
            step(&mut app, &mut terminal).await;
        }
        assert!(app.controller().turn_count() > 6);
        assert_eq!(app.view.scroll_position(), position);
        assert!(render_app_to_string(&mut app, 60, 14).contains("scrolled"));

        // Jumping back to the bottom resumes following
        app.handle_key(KeyEvent::new(KeyCode::End, KeyModifiers::CONTROL));
        draw(&mut terminal, &mut app);
        assert!(app.view.is_at_bottom());
        for _ in 0..2 {
            step(&mut app, &mut terminal).await;
        }
        assert!(app.view.is_at_bottom());
    }

    #[tokio::test]
    async fn test_export_hides_pending_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            export_dir: dir.path().to_path_buf(),
            ..test_config(20)
        };
        let (mut app, _service) = create_test_app_with(ScriptedService::new(), config);
        let mut terminal = create_test_terminal();

        type_text(&mut app, "space travel");
        app.handle_key(key(KeyCode::Enter));
        step(&mut app, &mut terminal).await;
        assert!(app.controller().is_pending());

        app.handle_key(ctrl('e'));
        let notification = app.notification.clone().unwrap();
        assert!(notification.starts_with("Saved"));
        assert!(app.controller().is_pending());

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("llm-talks-chat-"));
        let content = std::fs::read_to_string(&entries[0]).unwrap();
        assert!(content.contains("Topic: space travel"));
        assert!(!content.contains("waiting for the next turn"));
    }

    #[test]
    fn test_help_toggle_and_quit() {
        let (mut app, _service) = create_test_app(3);
        app.handle_key(key(KeyCode::F(1)));
        assert!(app.show_help);

        // Typing is ignored while help is open
        app.handle_key(key(KeyCode::Char('a')));
        assert!(app.input.is_empty());

        app.handle_key(ctrl('c'));
        assert!(!app.show_help);
        assert!(!app.should_quit);

        app.handle_key(ctrl('c'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_escape_clears_input() {
        let (mut app, _service) = create_test_app(3);
        type_text(&mut app, "space");
        app.handle_key(key(KeyCode::Esc));
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_notification_expires() {
        let (mut app, _service) = create_test_app(3);
        app.handle_action(Action::Start);
        assert!(app.notification.is_some());
        for _ in 0..NOTIFICATION_TICKS {
            app.tick();
        }
        assert!(app.notification.is_none());
    }
}
