//! Snapshot export of the rendered transcript.
//!
//! The actual rendering is delegated to a [`SnapshotRenderer`]; this module
//! only defines what the renderer sees and how artifacts are named.

use chrono::{DateTime, Utc};

use crate::transcript::Transcript;

/// Prefix of every exported artifact.
pub const SNAPSHOT_PREFIX: &str = "llm-talks-chat";

/// The region handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSource<'a> {
    pub transcript: &'a Transcript,
    /// Whether the pending indicator is currently visible.
    pub pending_visible: bool,
}

/// Renderer options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Width of the captured region, in columns.
    pub width: u16,
    /// Title drawn above the transcript, if any.
    pub title: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            width: 100,
            title: None,
        }
    }
}

/// An encoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. `txt`.
    pub extension: &'static str,
}

/// Turns the transcript region into an artifact.
pub trait SnapshotRenderer {
    fn capture(
        &self,
        source: SnapshotSource<'_>,
        options: &CaptureOptions,
    ) -> Result<Snapshot, ExportError>;
}

/// Artifact name derived from `now`, e.g.
/// `llm-talks-chat-2026-10-19T12-30-05.txt`.
pub fn snapshot_file_name(now: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{SNAPSHOT_PREFIX}-{}.{extension}",
        now.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error writing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The renderer could not produce a snapshot.
    #[error("Render error: {0}")]
    Render(String),
}
