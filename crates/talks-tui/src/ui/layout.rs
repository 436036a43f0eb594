//! Layout helpers for the talks TUI.

use ratatui::layout::{Constraint, Layout, Rect};

/// Height of the bordered topic input.
const INPUT_HEIGHT: u16 = 3;

/// Regions of the main screen, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenAreas {
    pub status: Rect,
    pub conversation: Rect,
    pub input: Rect,
    pub footer: Rect,
}

/// Split the screen into status bar, conversation, topic input and footer.
pub fn screen_layout(area: Rect) -> ScreenAreas {
    let [status, conversation, input, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(area);
    ScreenAreas {
        status,
        conversation,
        input,
        footer,
    }
}

/// Create a centered rect with fixed dimensions.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
