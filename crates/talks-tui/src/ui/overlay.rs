//! Modal overlays drawn over the main screen.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use super::layout::centered_fixed;
use crate::theme::Theme;

const HELP_TEXT: &str = r"
  Conversation
    Enter             Start on the entered topic
    Ctrl+P            Pause after the current turn
    Ctrl+R            Clear the conversation
    Ctrl+E            Export a snapshot

  Transcript
    Up/Down           Scroll
    PgUp/PgDn         Scroll a page
    Ctrl+Home/End     Jump to top/bottom

    F1                Toggle this help
    Ctrl+C            Quit
";

/// Render the help overlay.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer, theme: &Theme) {
    let width = 52.min(area.width.saturating_sub(4));
    let height = 17.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .style(Style::default().fg(theme.text).bg(theme.surface));

    Paragraph::new(HELP_TEXT)
        .block(block)
        .render(overlay_area, buf);
}

/// Render an error that needs acknowledging.
pub fn render_alert(area: Rect, buf: &mut Buffer, message: &str, theme: &Theme) {
    let width = 60.min(area.width.saturating_sub(4));
    let height = 7.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Error ")
        .title_style(Style::default().fg(theme.error).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.error))
        .style(Style::default().fg(theme.text).bg(theme.surface));

    let lines = vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "[Esc] dismiss",
            Style::default().fg(theme.muted),
        )),
    ];
    Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .render(overlay_area, buf);
}
