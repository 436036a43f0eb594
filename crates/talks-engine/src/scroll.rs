//! Autoscroll heuristic for the transcript view.
//!
//! Decides, after every append, whether the viewport should move to reveal
//! the newest content. A reader who scrolled up past the threshold is left
//! alone; the first message of a run is always revealed.

/// Default distance from the bottom (in rows) still counted as "at the bottom".
pub const DEFAULT_SCROLL_THRESHOLD: usize = 4;

/// Geometry of the scrollable transcript region, in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Total height of the rendered content.
    pub content_height: usize,
    /// Index of the first visible row.
    pub scroll_position: usize,
    /// Number of visible rows.
    pub visible_height: usize,
}

impl Viewport {
    pub fn new(content_height: usize, scroll_position: usize, visible_height: usize) -> Self {
        Self {
            content_height,
            scroll_position,
            visible_height,
        }
    }

    /// Rows of content below the visible region.
    pub fn distance_from_bottom(&self) -> usize {
        self.content_height
            .saturating_sub(self.scroll_position + self.visible_height)
    }

    /// Largest scroll position that still fills the viewport.
    pub fn max_scroll_position(&self) -> usize {
        self.content_height.saturating_sub(self.visible_height)
    }
}

/// Stateless scroll decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    threshold: usize,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}

impl ScrollPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether to reveal the newest content.
    ///
    /// `turn_count` is the run's turn count at the moment of the append.
    pub fn should_reveal(&self, viewport: &Viewport, turn_count: u32) -> bool {
        turn_count == 0 || viewport.distance_from_bottom() <= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_from_bottom() {
        assert_eq!(Viewport::new(100, 80, 20).distance_from_bottom(), 0);
        assert_eq!(Viewport::new(100, 50, 20).distance_from_bottom(), 30);
        // Content shorter than the viewport
        assert_eq!(Viewport::new(5, 0, 20).distance_from_bottom(), 0);
        assert_eq!(Viewport::new(100, 50, 20).max_scroll_position(), 80);
    }

    #[test]
    fn test_reveals_within_threshold() {
        let policy = ScrollPolicy::new(4);
        for position in 76..=80 {
            let viewport = Viewport::new(100, position, 20);
            assert!(policy.should_reveal(&viewport, 7), "position {position}");
        }
    }

    #[test]
    fn test_leaves_reader_alone_beyond_threshold() {
        let policy = ScrollPolicy::new(4);
        let viewport = Viewport::new(100, 75, 20);
        assert_eq!(viewport.distance_from_bottom(), 5);
        assert!(!policy.should_reveal(&viewport, 1));
        assert!(!policy.should_reveal(&Viewport::new(100, 0, 20), 12));
    }

    #[test]
    fn test_first_message_always_revealed() {
        let policy = ScrollPolicy::default();
        let scrolled_up = Viewport::new(500, 0, 20);
        assert!(policy.should_reveal(&scrolled_up, 0));
    }
}
