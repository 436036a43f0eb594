//! Theme components for the TUI.
//!
//! - [`Theme`] - Color palette (Catppuccin Mocha)
//! - [`SPINNER`] - Frames of the pending indicator

mod colors;

pub use colors::Theme;

/// Pending indicator frames, advanced once per tick.
pub const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Spinner frame for tick counter `frame`.
pub fn spinner_frame(frame: usize) -> &'static str {
    SPINNER[frame % SPINNER.len()]
}
