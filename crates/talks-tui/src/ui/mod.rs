//! Drawing of the main screen.

mod layout;
mod overlay;

pub use layout::screen_layout;
pub use overlay::{render_alert, render_help_overlay};

use ratatui::{widgets::Widget, Frame};

use crate::app::App;
use crate::conversation::{transcript_lines, ConversationPane};
use crate::theme::spinner_frame;
use crate::widgets::{hints_for_status, FooterHints, StatusBar, TopicInput};

/// Draw the whole screen.
///
/// Lays the transcript out first so the scroll state sees the geometry
/// that is about to be drawn.
pub fn render(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();
    let areas = screen_layout(area);

    let inner = ConversationPane::inner(areas.conversation);
    let pending = app.controller().is_pending().then(|| spinner_frame(app.tick));
    let lines = transcript_lines(
        app.controller().transcript(),
        pending,
        &app.theme,
        usize::from(inner.width),
    );
    app.view.sync(lines.len(), usize::from(inner.height));
    app.capture_width = inner.width;

    let status = app.status_content();
    let hints = hints_for_status(app.controller().status());
    let buf = frame.buffer_mut();

    StatusBar::new(&status, &app.theme).render(areas.status, buf);
    ConversationPane::new(&lines, &app.theme)
        .scroll(app.view.scroll_position())
        .title(app.controller().topic())
        .render(areas.conversation, buf);
    TopicInput::new(&app.input, &app.theme)
        .enabled(app.input_enabled())
        .placeholder(app.input_placeholder())
        .render(areas.input, buf);
    FooterHints::new(&hints, &app.theme)
        .notice(app.notification.as_deref())
        .render(areas.footer, buf);

    if app.show_help {
        render_help_overlay(area, buf, &app.theme);
    }
    if let Some(alert) = &app.alert {
        render_alert(area, buf, alert, &app.theme);
    }
}
