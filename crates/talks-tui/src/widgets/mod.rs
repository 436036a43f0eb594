//! UI widgets for the TUI.
//!
//! This module provides:
//! - [`StatusBar`] - Top status bar with run status, topic and turn counter
//! - [`FooterHints`] - Bottom notice and keybinding hints
//! - [`TopicInput`] - Single-line topic entry

mod footer_hints;
mod status_bar;
mod topic_input;

pub use footer_hints::{hints_for_status, FooterHints};
pub use status_bar::{StatusBar, StatusBarContent};
pub use topic_input::{TopicInput, TopicInputState};
