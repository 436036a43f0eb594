//! Plain-text snapshots of the rendered conversation.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Line,
    widgets::{Paragraph, Widget},
};
use talks_engine::{CaptureOptions, ExportError, Snapshot, SnapshotRenderer, SnapshotSource};

use crate::conversation::transcript_lines;
use crate::theme::{spinner_frame, Theme};

/// Rows rendered per buffer. Keeps every buffer well under the cell limit.
const CHUNK_ROWS: usize = 200;

/// Narrowest capture that still fits a header and some text.
const MIN_WIDTH: u16 = 10;

/// Renders the transcript through the same layout as the conversation pane
/// and writes the resulting cells out as text.
#[derive(Debug, Clone, Default)]
pub struct TextSnapshot {
    theme: Theme,
}

impl TextSnapshot {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl SnapshotRenderer for TextSnapshot {
    fn capture(
        &self,
        source: SnapshotSource<'_>,
        options: &CaptureOptions,
    ) -> Result<Snapshot, ExportError> {
        if options.width < MIN_WIDTH {
            return Err(ExportError::Render(format!(
                "capture width {} is below {MIN_WIDTH} columns",
                options.width
            )));
        }

        let width = usize::from(options.width);
        let pending = source.pending_visible.then(|| spinner_frame(0));
        let lines = transcript_lines(source.transcript, pending, &self.theme, width);

        let mut out = String::new();
        out.push_str(options.title.as_deref().unwrap_or("Conversation"));
        out.push('\n');
        out.push_str(&"─".repeat(width));
        out.push('\n');
        for chunk in lines.chunks(CHUNK_ROWS) {
            out.push_str(&render_rows(chunk, options.width)?);
            out.push('\n');
        }

        Ok(Snapshot {
            bytes: out.into_bytes(),
            extension: "txt",
        })
    }
}

fn render_rows(lines: &[Line<'static>], width: u16) -> Result<String, ExportError> {
    let height = u16::try_from(lines.len())
        .map_err(|_| ExportError::Render("chunk taller than a buffer".into()))?;
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    Paragraph::new(lines.to_vec()).render(area, &mut buf);
    Ok(buffer_to_string(&buf))
}

/// Convert a terminal buffer to text, one row per line, trailing blanks trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}
