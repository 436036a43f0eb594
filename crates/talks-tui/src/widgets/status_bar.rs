//! Status bar widget for the top of the TUI.
//!
//! Format: `● running │ "space travel" │ turn 3/20 │ ↓ following │ http://127.0.0.1:5000`

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use talks_engine::RunStatus;

use crate::text::truncate_to_width;
use crate::theme::Theme;

/// Longest topic shown before truncation, in cells.
const MAX_TOPIC_WIDTH: usize = 32;

/// Status bar content.
#[derive(Debug, Clone)]
pub struct StatusBarContent {
    pub status: RunStatus,
    /// Topic of the current run.
    pub topic: Option<String>,
    pub turn: u32,
    pub max_turns: u32,
    /// Server the client talks to.
    pub server: String,
    /// Whether the transcript is pinned to the newest message.
    pub following: bool,
}

impl Default for StatusBarContent {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            topic: None,
            turn: 0,
            max_turns: talks_engine::DEFAULT_MAX_TURNS,
            server: String::new(),
            following: true,
        }
    }
}

/// Status bar widget.
pub struct StatusBar<'a> {
    content: &'a StatusBarContent,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(content: &'a StatusBarContent, theme: &'a Theme) -> Self {
        Self { content, theme }
    }

    fn status_color(&self) -> Color {
        match self.content.status {
            RunStatus::Idle => self.theme.muted,
            RunStatus::Running => self.theme.success,
            RunStatus::Paused => self.theme.warning,
            RunStatus::Completed => self.theme.info,
            RunStatus::Failed => self.theme.error,
        }
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let separator = || Span::styled(" │ ", Style::default().fg(self.theme.muted));

        let mut spans = vec![
            Span::styled("● ", Style::default().fg(self.status_color())),
            Span::styled(
                self.content.status.to_string(),
                Style::default().fg(self.theme.text),
            ),
        ];

        if let Some(ref topic) = self.content.topic {
            spans.push(separator());
            spans.push(Span::styled(
                format!("\"{}\"", truncate_to_width(topic, MAX_TOPIC_WIDTH)),
                Style::default().fg(self.theme.text),
            ));
        }

        spans.push(separator());
        spans.push(Span::styled(
            format!("turn {}/{}", self.content.turn, self.content.max_turns),
            Style::default().fg(self.theme.info),
        ));

        spans.push(separator());
        let follow = if self.content.following {
            "↓ following"
        } else {
            "↑ scrolled"
        };
        spans.push(Span::styled(follow, Style::default().fg(self.theme.secondary)));

        if !self.content.server.is_empty() {
            spans.push(separator());
            spans.push(Span::styled(
                self.content.server.as_str(),
                Style::default().fg(self.theme.subtext),
            ));
        }

        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(self.theme.surface))
            .render(area, buf);
    }
}
