//! Conversation pane module.
//!
//! - [`transcript_lines`] lays the transcript out as styled lines
//! - [`ConversationPane`] draws a scrolled window onto those lines
//! - [`TranscriptView`] tracks the scroll position between draws

mod view;
mod widget;

pub use view::{TranscriptView, SCROLL_SPEED};
pub use widget::{transcript_lines, ConversationPane};
