//! talks-engine: Headless core of the talks conversation client
//!
//! This crate provides the orchestration logic for talks, including:
//! - The turn scheduler (run, pause, complete, fail, reset)
//! - The transcript and its scroll-follow policy
//! - The remote turn service and its HTTP client
//! - The conversation controller tying them together
//! - Configuration and snapshot export

pub mod config;
pub mod controller;
pub mod export;
pub mod http;
pub mod message;
pub mod pacing;
pub mod scheduler;
pub mod scroll;
pub mod service;
pub mod transcript;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{Config, ConfigError, CONFIG_DIR};
pub use controller::{ControllerOptions, ConversationController, ConversationEvent};
pub use export::{
    snapshot_file_name, CaptureOptions, ExportError, Snapshot, SnapshotRenderer, SnapshotSource,
    SNAPSHOT_PREFIX,
};
pub use http::HttpTurnService;
pub use message::Message;
pub use pacing::{ImmediatePacer, Pacer, TokioPacer};
pub use scheduler::{
    ConversationRunState, Effect, Failure, MessageOrigin, Request, RunStatus, Ticket,
    TurnScheduler, DEFAULT_MAX_TURNS, DEFAULT_PACING_DELAY,
};
pub use scroll::{ScrollPolicy, Viewport, DEFAULT_SCROLL_THRESHOLD};
pub use service::{ServiceError, StartRequest, TurnReply, TurnService};
pub use transcript::Transcript;

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
