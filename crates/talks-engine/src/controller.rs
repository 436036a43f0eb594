//! Conversation controller.
//!
//! Owns the [`TurnScheduler`] and the [`Transcript`] and carries out the
//! scheduler's requests against the remote [`TurnService`] and the
//! [`Pacer`]. Outstanding work is kept in a `FuturesUnordered` that is only
//! polled from [`ConversationController::next_event`], so everything runs
//! on the owner's task: there is no locking, and results from a previous
//! generation are simply dropped when they arrive.
//!
//! Progress is reported as [`ConversationEvent`]s on an unbounded channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::export::{
    snapshot_file_name, CaptureOptions, ExportError, SnapshotRenderer, SnapshotSource,
};
use crate::message::Message;
use crate::pacing::Pacer;
use crate::scheduler::{
    ConversationRunState, Effect, Failure, MessageOrigin, Request, RunStatus, Ticket,
    TurnScheduler, DEFAULT_MAX_TURNS, DEFAULT_PACING_DELAY,
};
use crate::service::{ServiceError, StartRequest, TurnReply, TurnService};
use crate::transcript::Transcript;

/// Events emitted while the conversation progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A run was started on `topic`.
    Started { topic: String, generation: u64 },
    /// A message landed at `index`. `turn_count` is the count at append time.
    MessageAppended {
        index: usize,
        turn_count: u32,
        origin: MessageOrigin,
    },
    /// The pending indicator was shown or hidden.
    PendingChanged(bool),
    StatusChanged(RunStatus),
    /// The turn ceiling was reached.
    Completed { turns: u32 },
    /// Initialization or a turn failed.
    Failed(Failure),
    /// Local state was reset.
    Reset,
    /// The remote service could not be told about the reset.
    ResetFailed(String),
}

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    pub max_turns: u32,
    pub pacing: Duration,
    pub model_a: Option<String>,
    pub model_b: Option<String>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            pacing: DEFAULT_PACING_DELAY,
            model_a: None,
            model_b: None,
        }
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_turns: config.max_turns,
            pacing: config.pacing_delay(),
            model_a: config.model_a.clone(),
            model_b: config.model_b.clone(),
        }
    }
}

enum Completion {
    Initialized(Ticket, Result<Vec<Message>, ServiceError>),
    Turn(Ticket, Result<TurnReply, ServiceError>),
    DelayElapsed(Ticket),
    ResetAcknowledged(Result<(), ServiceError>),
}

/// Top-level orchestrator for one conversation surface.
pub struct ConversationController {
    scheduler: TurnScheduler,
    transcript: Transcript,
    service: Arc<dyn TurnService>,
    pacer: Arc<dyn Pacer>,
    options: ControllerOptions,
    outstanding: FuturesUnordered<BoxFuture<'static, Completion>>,
    events: mpsc::UnboundedSender<ConversationEvent>,
    pending_visible: bool,
    topic: Option<String>,
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("state", self.scheduler.state())
            .field("messages", &self.transcript.len())
            .field("outstanding", &self.outstanding.len())
            .field("pending_visible", &self.pending_visible)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl ConversationController {
    /// Create a controller and the receiver for its events.
    pub fn new(
        service: Arc<dyn TurnService>,
        pacer: Arc<dyn Pacer>,
        options: ControllerOptions,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            scheduler: TurnScheduler::new(options.max_turns, options.pacing),
            transcript: Transcript::new(),
            service,
            pacer,
            options,
            outstanding: FuturesUnordered::new(),
            events,
            pending_visible: false,
            topic: None,
        };
        (controller, rx)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> &ConversationRunState {
        self.scheduler.state()
    }

    pub fn status(&self) -> RunStatus {
        self.scheduler.status()
    }

    pub fn turn_count(&self) -> u32 {
        self.scheduler.turn_count()
    }

    pub fn max_turns(&self) -> u32 {
        self.scheduler.max_turns()
    }

    /// Topic of the current run, if one was started since the last reset.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Whether the pending indicator is visible.
    pub fn is_pending(&self) -> bool {
        self.pending_visible
    }

    /// Whether any remote call, delay or reset acknowledgement is outstanding.
    pub fn is_busy(&self) -> bool {
        !self.outstanding.is_empty()
    }

    /// Whether the topic input should accept a new run.
    pub fn can_start(&self) -> bool {
        self.scheduler.can_start()
    }

    /// Start a run on `topic`. Returns `false` when the start was ignored.
    pub fn start(&mut self, topic: &str) -> bool {
        let effects = self.scheduler.start(topic);
        if effects.is_empty() {
            debug!(status = %self.status(), "start ignored");
            return false;
        }

        let topic = topic.trim().to_string();
        let generation = self.scheduler.generation();
        info!(%topic, generation, "starting conversation");
        self.topic = Some(topic.clone());
        self.emit(ConversationEvent::Started { topic, generation });
        self.apply(effects);
        true
    }

    /// Stop arming turns. Returns `false` when no run was live.
    pub fn pause(&mut self) -> bool {
        let effects = self.scheduler.pause();
        if effects.is_empty() {
            return false;
        }
        info!(turns = self.turn_count(), "conversation paused");
        self.apply(effects);
        true
    }

    /// Clear the transcript and run state, then notify the remote service.
    ///
    /// The local reset is final; a failed notification is only reported.
    pub fn reset(&mut self) {
        info!("resetting conversation");
        let effects = self.scheduler.reset();
        self.topic = None;
        self.apply(effects);
        self.emit(ConversationEvent::Reset);
    }

    /// Wait for the next outstanding completion and apply it.
    ///
    /// Returns `false` immediately when nothing is outstanding. Cancel safe.
    pub async fn next_event(&mut self) -> bool {
        match self.outstanding.next().await {
            Some(completion) => {
                self.complete(completion);
                true
            }
            None => false,
        }
    }

    /// Drive outstanding work until nothing is left.
    pub async fn run_until_idle(&mut self) {
        while self.next_event().await {}
    }

    /// Capture the transcript region and write it under `dir`.
    ///
    /// The pending indicator is hidden for the capture and restored after.
    pub fn export(
        &mut self,
        renderer: &dyn SnapshotRenderer,
        options: &CaptureOptions,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let restore = self.pending_visible;
        self.pending_visible = false;
        let captured = renderer.capture(
            SnapshotSource {
                transcript: &self.transcript,
                pending_visible: self.pending_visible,
            },
            options,
        );
        self.pending_visible = restore;

        let snapshot = captured.inspect_err(|e| error!(error = %e, "export failed"))?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(snapshot_file_name(Utc::now(), snapshot.extension));
        std::fs::write(&path, &snapshot.bytes)?;
        info!(path = %path.display(), bytes = snapshot.bytes.len(), "exported snapshot");
        Ok(path)
    }

    fn complete(&mut self, completion: Completion) {
        let effects = match completion {
            Completion::Initialized(ticket, result) => {
                if !self.is_current(ticket) {
                    return;
                }
                self.scheduler
                    .on_initialized(ticket, result.map_err(|e| e.to_string()))
            }
            Completion::Turn(ticket, result) => {
                if !self.is_current(ticket) {
                    return;
                }
                self.scheduler.on_turn(ticket, result.map_err(|e| e.to_string()))
            }
            Completion::DelayElapsed(ticket) => {
                if !self.is_current(ticket) {
                    return;
                }
                self.scheduler.on_delay_elapsed(ticket)
            }
            Completion::ResetAcknowledged(Ok(())) => {
                debug!("remote session reset");
                return;
            }
            Completion::ResetAcknowledged(Err(e)) => {
                warn!(error = %e, "remote reset failed, local state kept");
                self.emit(ConversationEvent::ResetFailed(e.to_string()));
                return;
            }
        };
        self.apply(effects);
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        let current = self.scheduler.outstanding() == Some(ticket);
        if !current {
            debug!(
                generation = ticket.generation,
                sequence = ticket.sequence,
                current_generation = self.scheduler.generation(),
                "discarding stale completion"
            );
        }
        current
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ClearTranscript => self.transcript.clear(),
                Effect::Append {
                    message,
                    turn_count,
                    origin,
                } => {
                    debug!(speaker = %message.speaker, turn_count, "appending message");
                    let index = self.transcript.append(message);
                    self.emit(ConversationEvent::MessageAppended {
                        index,
                        turn_count,
                        origin,
                    });
                }
                Effect::ShowPending => {
                    self.pending_visible = true;
                    self.emit(ConversationEvent::PendingChanged(true));
                }
                Effect::HidePending => {
                    self.pending_visible = false;
                    self.emit(ConversationEvent::PendingChanged(false));
                }
                Effect::Issue(request) => self.dispatch(request),
                Effect::StatusChanged(status) => {
                    self.emit(ConversationEvent::StatusChanged(status));
                    if status == RunStatus::Completed {
                        let turns = self.turn_count();
                        info!(turns, "conversation completed");
                        self.emit(ConversationEvent::Completed { turns });
                    }
                }
                Effect::Report(failure) => {
                    error!(%failure, "conversation halted");
                    self.emit(ConversationEvent::Failed(failure));
                }
                Effect::ResetSession => {
                    let service = Arc::clone(&self.service);
                    self.outstanding.push(Box::pin(async move {
                        Completion::ResetAcknowledged(service.reset_session().await)
                    }));
                }
            }
        }
    }

    fn dispatch(&mut self, request: Request) {
        debug!(?request, "issuing request");
        match request {
            Request::Initialize { ticket, topic } => {
                let service = Arc::clone(&self.service);
                let start = StartRequest {
                    topic,
                    model_a: self.options.model_a.clone(),
                    model_b: self.options.model_b.clone(),
                };
                self.outstanding.push(Box::pin(async move {
                    let result = service.initialize(&start).await;
                    Completion::Initialized(ticket, result)
                }));
            }
            Request::NextTurn { ticket } => {
                let service = Arc::clone(&self.service);
                self.outstanding.push(Box::pin(async move {
                    Completion::Turn(ticket, service.next_turn().await)
                }));
            }
            Request::Delay { ticket, duration } => {
                let pacer = Arc::clone(&self.pacer);
                self.outstanding.push(Box::pin(async move {
                    pacer.wait(duration).await;
                    Completion::DelayElapsed(ticket)
                }));
            }
        }
    }

    fn emit(&self, event: ConversationEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }
}
