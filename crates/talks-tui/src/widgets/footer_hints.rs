//! Footer widget.
//!
//! Format: `Saved ./llm-talks-chat-….txt        [Ctrl+P] pause │ [Ctrl+R] clear │ [F1] help`
//!
//! The left side carries the latest notice, the right side the keybindings
//! that apply to the current run status.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use talks_engine::RunStatus;
use unicode_width::UnicodeWidthStr;

use crate::theme::Theme;

/// A single keybinding hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHint {
    /// The key or key combination (e.g., "Enter", "Ctrl+P").
    pub key: String,
    /// The action description (e.g., "start", "pause").
    pub action: String,
}

impl KeyHint {
    pub fn new(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
        }
    }
}

/// Hints for a run status.
///
/// Enter only starts a run while the topic input is enabled, and pause only
/// applies to a live run.
#[must_use]
pub fn hints_for_status(status: RunStatus) -> Vec<KeyHint> {
    let mut hints = Vec::new();
    match status {
        RunStatus::Idle | RunStatus::Paused | RunStatus::Failed => {
            hints.push(KeyHint::new("Enter", "start"));
        }
        RunStatus::Running => hints.push(KeyHint::new("Ctrl+P", "pause")),
        RunStatus::Completed => {}
    }
    hints.push(KeyHint::new("Ctrl+R", "clear"));
    hints.push(KeyHint::new("Ctrl+E", "export"));
    hints.push(KeyHint::new("F1", "help"));
    hints
}

/// Footer widget.
pub struct FooterHints<'a> {
    hints: &'a [KeyHint],
    theme: &'a Theme,
    notice: Option<&'a str>,
}

impl<'a> FooterHints<'a> {
    pub fn new(hints: &'a [KeyHint], theme: &'a Theme) -> Self {
        Self {
            hints,
            theme,
            notice: None,
        }
    }

    /// Message shown on the left.
    #[must_use]
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }
}

impl Widget for FooterHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut left_spans = Vec::new();
        let mut right_spans = Vec::new();

        if let Some(notice) = self.notice {
            left_spans.push(Span::styled(
                notice.to_string(),
                Style::default().fg(self.theme.warning),
            ));
        }

        for (i, hint) in self.hints.iter().enumerate() {
            if i > 0 {
                right_spans.push(Span::styled(" │ ", Style::default().fg(self.theme.muted)));
            }
            right_spans.push(Span::styled("[", Style::default().fg(self.theme.muted)));
            right_spans.push(Span::styled(
                hint.key.clone(),
                Style::default().fg(self.theme.primary),
            ));
            right_spans.push(Span::styled("] ", Style::default().fg(self.theme.muted)));
            right_spans.push(Span::styled(
                hint.action.clone(),
                Style::default().fg(self.theme.subtext),
            ));
        }

        let width = |spans: &[Span<'_>]| -> usize {
            spans.iter().map(|s| s.content.as_ref().width()).sum()
        };
        let padding = (area.width as usize).saturating_sub(width(&left_spans) + width(&right_spans));
        if padding > 0 {
            left_spans.push(Span::raw(" ".repeat(padding)));
        }
        left_spans.extend(right_spans);

        Paragraph::new(Line::from(left_spans))
            .style(Style::default().bg(self.theme.surface))
            .render(area, buf);
    }
}
