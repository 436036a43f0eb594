//! Conversation pane widget.
//!
//! Renders the transcript as styled lines inside a bordered block, scrolled
//! by the [`TranscriptView`](super::TranscriptView).

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use talks_engine::{Message, Transcript};

use crate::text::{sanitize, wrap_indented};
use crate::theme::Theme;

/// Indentation of message bodies under their header.
const BODY_INDENT: &str = "  ";

const EMPTY_HINT: &str = "Enter a topic below and press Enter to start a conversation.";

/// Lay the transcript out as lines for a region `width` columns wide.
///
/// `pending` is the spinner frame to show below the last message, if the
/// pending indicator is visible.
pub fn transcript_lines(
    transcript: &Transcript,
    pending: Option<&str>,
    theme: &Theme,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if transcript.is_empty() && pending.is_none() {
        lines.push(Line::from(Span::styled(
            EMPTY_HINT,
            Style::default().fg(theme.muted),
        )));
        return lines;
    }

    for (i, message) in transcript.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(header_line(message, theme));
        let body = sanitize(&message.text);
        for row in wrap_indented(&body, width, BODY_INDENT) {
            lines.push(Line::from(Span::styled(row, Style::default().fg(theme.text))));
        }
    }

    if let Some(frame) = pending {
        if !transcript.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            format!("{frame} waiting for the next turn…"),
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn header_line(message: &Message, theme: &Theme) -> Line<'static> {
    let mut spans = vec![Span::styled(
        sanitize(&message.speaker),
        Style::default()
            .fg(theme.speaker(&message.speaker))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(model) = &message.model {
        spans.push(Span::styled(
            format!(" ({})", sanitize(model)),
            Style::default().fg(theme.muted),
        ));
    }
    Line::from(spans)
}

/// Conversation pane widget.
///
/// ```text
/// ┌ Conversation ─────────────────────┐
/// │Moderator (System)                 │
/// │  Topic: space travel              │
/// │                                   │
/// │Model A                            │
/// │  Getting to Mars first means...   │
/// │                                   │
/// │/ waiting for the next turn…       │
/// └───────────────────────────────────┘
/// ```
pub struct ConversationPane<'a> {
    lines: &'a [Line<'static>],
    scroll: usize,
    theme: &'a Theme,
    title: Option<&'a str>,
}

impl<'a> ConversationPane<'a> {
    pub fn new(lines: &'a [Line<'static>], theme: &'a Theme) -> Self {
        Self {
            lines,
            scroll: 0,
            theme,
            title: None,
        }
    }

    /// Index of the first visible line.
    #[must_use]
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Replace the default title.
    #[must_use]
    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    /// Area available to lines inside `area`.
    pub fn inner(area: Rect) -> Rect {
        Block::default().borders(Borders::ALL).inner(area)
    }
}

impl Widget for ConversationPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.title {
            Some(title) => format!(" {title} "),
            None => " Conversation ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .title_style(Style::default().fg(self.theme.text))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .style(Style::default().bg(self.theme.base));

        let inner = block.inner(area);
        block.render(area, buf);

        let visible: Vec<Line<'static>> = self
            .lines
            .iter()
            .skip(self.scroll)
            .take(inner.height as usize)
            .cloned()
            .collect();
        Paragraph::new(visible).render(inner, buf);
    }
}
