//! Single-line topic input.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::theme::Theme;

const PROMPT: &str = "> ";

/// Content and cursor of the topic input.
///
/// The cursor is a character index, not a byte offset.
#[derive(Debug, Clone, Default)]
pub struct TopicInputState {
    content: String,
    cursor: usize,
}

impl TopicInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Take the content, clearing the state.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    /// Insert a character at the cursor. Line breaks are ignored.
    pub fn insert(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.insert(ch);
        }
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }
}

/// Topic input widget.
///
/// ```text
/// ┌ Topic ───────────────────────────┐
/// │ > space travel_                  │
/// └──────────────────────────────────┘
/// ```
pub struct TopicInput<'a> {
    state: &'a TopicInputState,
    theme: &'a Theme,
    enabled: bool,
    placeholder: &'a str,
}

impl<'a> TopicInput<'a> {
    pub fn new(state: &'a TopicInputState, theme: &'a Theme) -> Self {
        Self {
            state,
            theme,
            enabled: true,
            placeholder: "",
        }
    }

    /// A disabled input is dimmed and shows no cursor.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    fn line(&self) -> Line<'a> {
        let text_style = if self.enabled {
            Style::default().fg(self.theme.text)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let mut spans = vec![Span::styled(PROMPT, Style::default().fg(self.theme.primary))];

        if self.state.is_empty() {
            if self.enabled {
                spans.push(Span::styled("_", text_style));
            }
            spans.push(Span::styled(
                self.placeholder,
                Style::default().fg(self.theme.muted),
            ));
            return Line::from(spans);
        }

        let cursor = self.state.cursor();
        let mut before = String::new();
        let mut after = String::new();
        for (i, ch) in self.state.content().chars().enumerate() {
            if i < cursor {
                before.push(ch);
            } else {
                after.push(ch);
            }
        }
        spans.push(Span::styled(before, text_style));
        if self.enabled {
            let marker = if after.is_empty() { "_" } else { "|" };
            spans.push(Span::styled(marker, Style::default().fg(self.theme.text)));
        }
        spans.push(Span::styled(after, text_style));
        Line::from(spans)
    }
}

impl Widget for TopicInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.enabled {
            Style::default().fg(self.theme.border_focused)
        } else {
            Style::default().fg(self.theme.border)
        };
        let block = Block::default()
            .title(" Topic ")
            .title_style(Style::default().fg(self.theme.text))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(self.theme.base));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }
        Paragraph::new(self.line()).render(inner, buf);
    }
}
