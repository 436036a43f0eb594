//! Scroll state of the transcript region.

use talks_engine::Viewport;

/// Lines scrolled per mouse wheel tick.
pub const SCROLL_SPEED: usize = 3;

/// Scroll position plus the geometry seen at the last draw.
///
/// Geometry is only known after layout, so a reveal is recorded and applied
/// at the next [`sync`](Self::sync).
#[derive(Debug, Clone, Default)]
pub struct TranscriptView {
    scroll: usize,
    content_height: usize,
    visible_height: usize,
    reveal_pending: bool,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first visible line.
    pub fn scroll_position(&self) -> usize {
        self.scroll
    }

    /// Geometry as of the last draw.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.content_height, self.scroll, self.visible_height)
    }

    /// Whether the newest line is (or will be, after the next draw) visible.
    pub fn is_at_bottom(&self) -> bool {
        self.reveal_pending || self.viewport().distance_from_bottom() == 0
    }

    /// Record fresh geometry and settle the scroll position.
    pub fn sync(&mut self, content_height: usize, visible_height: usize) {
        self.content_height = content_height;
        self.visible_height = visible_height;
        let max = self.viewport().max_scroll_position();
        if self.reveal_pending {
            self.scroll = max;
            self.reveal_pending = false;
        } else {
            self.scroll = self.scroll.min(max);
        }
    }

    /// Scroll to the newest content at the next sync.
    pub fn reveal_latest(&mut self) {
        self.reveal_pending = true;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.reveal_pending = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max = self.viewport().max_scroll_position();
        self.scroll = (self.scroll + lines).min(max);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.visible_height.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.visible_height.max(1));
    }

    pub fn jump_to_top(&mut self) {
        self.reveal_pending = false;
        self.scroll = 0;
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll = self.viewport().max_scroll_position();
        self.reveal_pending = true;
    }

    /// Forget the scroll position, keeping the last known geometry.
    pub fn reset(&mut self) {
        self.scroll = 0;
        self.reveal_pending = false;
    }
}
