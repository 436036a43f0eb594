//! Turn scheduling state machine.
//!
//! The scheduler never performs I/O. Every transition returns a list of
//! [`Effect`]s that the caller applies in order: append a message, toggle the
//! pending indicator, issue a [`Request`] to the remote service or the pacer,
//! and so on. Completions are fed back through `on_*` methods together with
//! the [`Ticket`] they were issued with; a ticket from an older generation (a
//! run that was since reset or restarted) no longer matches and the
//! completion is discarded.
//!
//! At most one current-generation request is outstanding at any time, which
//! keeps the loop strictly sequential: request, append, delay, request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::service::TurnReply;

/// Default ceiling on turns per run.
pub const DEFAULT_MAX_TURNS: u32 = 20;

/// Default wait between a completed turn and the next request.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(1500);

/// Run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run, inputs enabled.
    #[default]
    Idle,
    /// Initialization or the turn loop is live.
    Running,
    /// Stopped by the user; an in-flight turn may still land.
    Paused,
    /// Turn ceiling reached. Only a reset allows another run.
    Completed,
    /// A turn failed. The loop is dead; no retry is attempted.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Observable state of the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRunState {
    pub status: RunStatus,
    /// Turns appended since the last start or reset.
    pub turn_count: u32,
    pub max_turns: u32,
    /// Epoch counter, bumped by every start and reset.
    pub generation: u64,
}

/// Tag attached to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub sequence: u64,
}

/// Work the caller must perform on the scheduler's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Open a session on the remote service.
    Initialize { ticket: Ticket, topic: String },
    /// Ask the remote service for the next turn.
    NextTurn { ticket: Ticket },
    /// Wait before the next turn.
    Delay { ticket: Ticket, duration: Duration },
}

impl Request {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Initialize { ticket, .. } | Self::NextTurn { ticket } | Self::Delay { ticket, .. } => {
                *ticket
            }
        }
    }
}

/// Where an appended message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Initial context returned by the initialization call.
    History,
    /// A generated turn.
    Turn,
}

/// Failures reported by the scheduler. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The initialization call failed; the run is back to idle.
    Initialization(String),
    /// The service answered a turn request with an error payload.
    TurnRejected(String),
    /// The turn request never produced a usable answer.
    Transport(String),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialization(e) => write!(f, "failed to start conversation: {e}"),
            Self::TurnRejected(e) => write!(f, "turn rejected: {e}"),
            Self::Transport(e) => write!(f, "error fetching turn: {e}"),
        }
    }
}

/// Single step of output from a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Drop every message in the transcript.
    ClearTranscript,
    /// Append a message. `turn_count` is the count at append time.
    Append {
        message: Message,
        turn_count: u32,
        origin: MessageOrigin,
    },
    ShowPending,
    HidePending,
    Issue(Request),
    StatusChanged(RunStatus),
    Report(Failure),
    /// Tell the remote service to discard its session.
    ResetSession,
}

/// The run/pause/stop state machine.
#[derive(Debug)]
pub struct TurnScheduler {
    state: ConversationRunState,
    pacing: Duration,
    next_sequence: u64,
    outstanding: Option<Ticket>,
    pending: bool,
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, DEFAULT_PACING_DELAY)
    }
}

impl TurnScheduler {
    pub fn new(max_turns: u32, pacing: Duration) -> Self {
        Self {
            state: ConversationRunState {
                status: RunStatus::Idle,
                turn_count: 0,
                max_turns,
                generation: 0,
            },
            pacing,
            next_sequence: 0,
            outstanding: None,
            pending: false,
        }
    }

    pub fn state(&self) -> &ConversationRunState {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    pub fn turn_count(&self) -> u32 {
        self.state.turn_count
    }

    pub fn max_turns(&self) -> u32 {
        self.state.max_turns
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Whether the pending indicator should be shown.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// The current-generation request still awaiting completion.
    pub fn outstanding(&self) -> Option<Ticket> {
        self.outstanding
    }

    /// Whether a new run may be started.
    pub fn can_start(&self) -> bool {
        matches!(
            self.state.status,
            RunStatus::Idle | RunStatus::Paused | RunStatus::Failed
        )
    }

    /// Begin a new run on `topic`.
    ///
    /// An empty topic is ignored. So is a start while a run is live or
    /// after the turn ceiling was reached (that needs a reset first).
    pub fn start(&mut self, topic: &str) -> Vec<Effect> {
        let topic = topic.trim();
        if topic.is_empty() || !self.can_start() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.state.generation += 1;
        self.state.turn_count = 0;
        self.outstanding = None;
        self.hide_pending(&mut effects);
        effects.push(Effect::ClearTranscript);
        self.set_status(RunStatus::Running, &mut effects);

        let ticket = self.issue();
        effects.push(Effect::Issue(Request::Initialize {
            ticket,
            topic: topic.to_string(),
        }));
        effects
    }

    /// Apply the initialization result.
    ///
    /// `Err` carries the reason the call failed.
    pub fn on_initialized(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Message>, String>,
    ) -> Vec<Effect> {
        if !self.accept(ticket) {
            return Vec::new();
        }

        let mut effects = Vec::new();
        match result {
            Ok(history) => {
                for message in history {
                    effects.push(Effect::Append {
                        message,
                        turn_count: self.state.turn_count,
                        origin: MessageOrigin::History,
                    });
                }
                self.tick(&mut effects);
            }
            Err(reason) => {
                self.set_status(RunStatus::Idle, &mut effects);
                effects.push(Effect::Report(Failure::Initialization(reason)));
            }
        }
        effects
    }

    /// Apply the answer to a turn request.
    ///
    /// `Err` is a transport failure; an error payload arrives as
    /// `Ok(TurnReply::Error(..))`. Either one halts the loop for good.
    pub fn on_turn(&mut self, ticket: Ticket, result: Result<TurnReply, String>) -> Vec<Effect> {
        if !self.accept(ticket) {
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.hide_pending(&mut effects);

        match result {
            Ok(TurnReply::Message(message)) => {
                effects.push(Effect::Append {
                    message,
                    turn_count: self.state.turn_count,
                    origin: MessageOrigin::Turn,
                });
                self.state.turn_count += 1;

                if self.state.turn_count >= self.state.max_turns {
                    self.set_status(RunStatus::Completed, &mut effects);
                } else if self.state.status == RunStatus::Running {
                    let ticket = self.issue();
                    effects.push(Effect::Issue(Request::Delay {
                        ticket,
                        duration: self.pacing,
                    }));
                }
            }
            Ok(TurnReply::Error(error)) => {
                self.set_status(RunStatus::Failed, &mut effects);
                effects.push(Effect::Report(Failure::TurnRejected(error)));
            }
            Err(error) => {
                self.set_status(RunStatus::Failed, &mut effects);
                effects.push(Effect::Report(Failure::Transport(error)));
            }
        }
        effects
    }

    /// The pacing delay for `ticket` elapsed.
    pub fn on_delay_elapsed(&mut self, ticket: Ticket) -> Vec<Effect> {
        if !self.accept(ticket) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.tick(&mut effects);
        effects
    }

    /// Stop arming further turns. A request already in flight still lands.
    pub fn pause(&mut self) -> Vec<Effect> {
        if self.state.status != RunStatus::Running {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.set_status(RunStatus::Paused, &mut effects);
        effects
    }

    /// Return to idle from any state. Every outstanding ticket goes stale.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.state.generation += 1;
        self.state.turn_count = 0;
        self.outstanding = None;
        self.hide_pending(&mut effects);
        effects.push(Effect::ClearTranscript);
        self.set_status(RunStatus::Idle, &mut effects);
        effects.push(Effect::ResetSession);
        effects
    }

    /// Loop body: request the next turn or stop at the boundary.
    fn tick(&mut self, effects: &mut Vec<Effect>) {
        if self.state.status != RunStatus::Running {
            self.hide_pending(effects);
            return;
        }

        if self.state.turn_count >= self.state.max_turns {
            self.hide_pending(effects);
            self.set_status(RunStatus::Completed, effects);
            return;
        }

        self.pending = true;
        effects.push(Effect::ShowPending);
        let ticket = self.issue();
        effects.push(Effect::Issue(Request::NextTurn { ticket }));
    }

    fn issue(&mut self) -> Ticket {
        self.next_sequence += 1;
        let ticket = Ticket {
            generation: self.state.generation,
            sequence: self.next_sequence,
        };
        self.outstanding = Some(ticket);
        ticket
    }

    /// Consume the outstanding ticket if `ticket` is it.
    fn accept(&mut self, ticket: Ticket) -> bool {
        if self.outstanding == Some(ticket) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }

    fn hide_pending(&mut self, effects: &mut Vec<Effect>) {
        if self.pending {
            self.pending = false;
            effects.push(Effect::HidePending);
        }
    }

    fn set_status(&mut self, status: RunStatus, effects: &mut Vec<Effect>) {
        if self.state.status != status {
            self.state.status = status;
            effects.push(Effect::StatusChanged(status));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued(effects: &[Effect]) -> Vec<Request> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Issue(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    fn single_request(effects: &[Effect]) -> Request {
        let requests = issued(effects);
        assert_eq!(requests.len(), 1, "expected one request in {effects:?}");
        requests[0].clone()
    }

    fn appended(effects: &[Effect]) -> Vec<(String, u32)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Append {
                    message,
                    turn_count,
                    ..
                } => Some((message.speaker.clone(), *turn_count)),
                _ => None,
            })
            .collect()
    }

    fn turn(n: u32) -> Result<TurnReply, String> {
        let speaker = if n % 2 == 0 { "Model A" } else { "Model B" };
        Ok(TurnReply::Message(Message::new(speaker, format!("turn {n}"))))
    }

    /// Start a run and complete initialization, returning the first turn request.
    fn running(scheduler: &mut TurnScheduler) -> Request {
        let effects = scheduler.start("space travel");
        let init = single_request(&effects);
        let effects = scheduler.on_initialized(
            init.ticket(),
            Ok(vec![Message::new("Moderator", "Topic: space travel")]),
        );
        single_request(&effects)
    }

    #[test]
    fn test_empty_topic_is_noop() {
        let mut scheduler = TurnScheduler::default();
        assert!(scheduler.start("").is_empty());
        assert!(scheduler.start("   ").is_empty());
        assert_eq!(scheduler.status(), RunStatus::Idle);
        assert_eq!(scheduler.generation(), 0);
        assert!(scheduler.outstanding().is_none());
    }

    #[test]
    fn test_start_issues_initialization() {
        let mut scheduler = TurnScheduler::default();
        let effects = scheduler.start("  space travel ");

        assert_eq!(effects[0], Effect::ClearTranscript);
        assert!(effects.contains(&Effect::StatusChanged(RunStatus::Running)));
        match single_request(&effects) {
            Request::Initialize { topic, ticket } => {
                assert_eq!(topic, "space travel");
                assert_eq!(ticket.generation, 1);
            }
            other => panic!("unexpected request {other:?}"),
        }
        assert_eq!(scheduler.status(), RunStatus::Running);
        assert_eq!(scheduler.turn_count(), 0);
    }

    #[test]
    fn test_start_while_running_is_ignored() {
        let mut scheduler = TurnScheduler::default();
        running(&mut scheduler);
        let generation = scheduler.generation();

        assert!(scheduler.start("other topic").is_empty());
        assert_eq!(scheduler.generation(), generation);
    }

    #[test]
    fn test_initialization_appends_history_then_requests_turn() {
        let mut scheduler = TurnScheduler::default();
        let init = single_request(&scheduler.start("space travel"));
        let effects = scheduler.on_initialized(
            init.ticket(),
            Ok(vec![Message::new("Moderator", "Topic: space travel")]),
        );

        assert_eq!(appended(&effects), vec![("Moderator".to_string(), 0)]);
        assert!(effects.contains(&Effect::ShowPending));
        assert!(matches!(single_request(&effects), Request::NextTurn { .. }));
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_initialization_failure_returns_to_idle() {
        let mut scheduler = TurnScheduler::default();
        let init = single_request(&scheduler.start("space travel"));
        let effects = scheduler.on_initialized(init.ticket(), Err("connection refused".into()));

        assert_eq!(scheduler.status(), RunStatus::Idle);
        assert!(issued(&effects).is_empty());
        assert!(effects.contains(&Effect::Report(Failure::Initialization(
            "connection refused".into()
        ))));
        assert!(scheduler.can_start());
    }

    #[test]
    fn test_successful_turn_arms_pacing_delay() {
        let mut scheduler = TurnScheduler::new(20, Duration::from_millis(1500));
        let next = running(&mut scheduler);

        let effects = scheduler.on_turn(next.ticket(), turn(0));
        assert_eq!(appended(&effects), vec![("Model A".to_string(), 0)]);
        assert!(effects.contains(&Effect::HidePending));
        assert_eq!(scheduler.turn_count(), 1);

        match single_request(&effects) {
            Request::Delay { duration, .. } => assert_eq!(duration, Duration::from_millis(1500)),
            other => panic!("unexpected request {other:?}"),
        }

        let delay = single_request(&effects);
        let effects = scheduler.on_delay_elapsed(delay.ticket());
        assert!(matches!(single_request(&effects), Request::NextTurn { .. }));
    }

    #[test]
    fn test_space_travel_scenario() {
        let mut scheduler = TurnScheduler::default();
        let mut next = running(&mut scheduler);

        for n in 0..3 {
            let effects = scheduler.on_turn(next.ticket(), turn(n));
            let delay = single_request(&effects);
            next = single_request(&scheduler.on_delay_elapsed(delay.ticket()));
        }
        assert_eq!(scheduler.turn_count(), 3);

        let effects = scheduler.on_turn(next.ticket(), Ok(TurnReply::Error("rate limited".into())));
        assert!(appended(&effects).is_empty());
        assert!(issued(&effects).is_empty());
        assert!(effects.contains(&Effect::HidePending));
        assert!(effects.contains(&Effect::Report(Failure::TurnRejected(
            "rate limited".into()
        ))));
        assert_eq!(scheduler.status(), RunStatus::Failed);
        assert_eq!(scheduler.turn_count(), 3);
        assert!(scheduler.outstanding().is_none());
    }

    #[test]
    fn test_transport_failure_halts_without_retry() {
        let mut scheduler = TurnScheduler::default();
        let next = running(&mut scheduler);

        let effects = scheduler.on_turn(next.ticket(), Err("connection reset".into()));
        assert!(issued(&effects).is_empty());
        assert_eq!(scheduler.status(), RunStatus::Failed);
        assert!(!scheduler.is_pending());

        // A failed run can be restarted
        assert!(!scheduler.start("again").is_empty());
    }

    #[test]
    fn test_turn_ceiling_completes_run() {
        let mut scheduler = TurnScheduler::new(20, Duration::ZERO);
        let mut next = running(&mut scheduler);

        for n in 0..20 {
            let effects = scheduler.on_turn(next.ticket(), turn(n));
            if n < 19 {
                let delay = single_request(&effects);
                next = single_request(&scheduler.on_delay_elapsed(delay.ticket()));
            } else {
                assert!(issued(&effects).is_empty(), "no 21st call may be armed");
                assert!(effects.contains(&Effect::StatusChanged(RunStatus::Completed)));
            }
        }

        assert_eq!(scheduler.turn_count(), 20);
        assert_eq!(scheduler.status(), RunStatus::Completed);
        assert!(scheduler.outstanding().is_none());

        // Completed needs a reset before another run
        assert!(scheduler.start("again").is_empty());
        scheduler.reset();
        assert!(!scheduler.start("again").is_empty());
    }

    #[test]
    fn test_zero_ceiling_completes_after_history() {
        let mut scheduler = TurnScheduler::new(0, Duration::ZERO);
        let init = single_request(&scheduler.start("topic"));
        let effects = scheduler.on_initialized(init.ticket(), Ok(vec![Message::new("Moderator", "hi")]));

        assert_eq!(appended(&effects).len(), 1);
        assert!(issued(&effects).is_empty());
        assert_eq!(scheduler.status(), RunStatus::Completed);
    }

    #[test]
    fn test_pause_lets_in_flight_turn_land() {
        let mut scheduler = TurnScheduler::default();
        let next = running(&mut scheduler);

        let effects = scheduler.pause();
        assert_eq!(effects, vec![Effect::StatusChanged(RunStatus::Paused)]);

        let effects = scheduler.on_turn(next.ticket(), turn(0));
        assert_eq!(appended(&effects).len(), 1);
        assert!(issued(&effects).is_empty(), "no call armed after pause");
        assert_eq!(scheduler.turn_count(), 1);
        assert_eq!(scheduler.status(), RunStatus::Paused);
    }

    #[test]
    fn test_pause_during_delay_stops_at_boundary() {
        let mut scheduler = TurnScheduler::default();
        let next = running(&mut scheduler);
        let delay = single_request(&scheduler.on_turn(next.ticket(), turn(0)));

        scheduler.pause();
        let effects = scheduler.on_delay_elapsed(delay.ticket());
        assert!(issued(&effects).is_empty());
        assert_eq!(scheduler.status(), RunStatus::Paused);
    }

    #[test]
    fn test_pause_when_not_running_is_noop() {
        let mut scheduler = TurnScheduler::default();
        assert!(scheduler.pause().is_empty());
        assert_eq!(scheduler.status(), RunStatus::Idle);
    }

    #[test]
    fn test_restart_from_paused() {
        let mut scheduler = TurnScheduler::default();
        let stale = running(&mut scheduler);
        scheduler.pause();

        let effects = scheduler.start("new topic");
        assert!(effects.contains(&Effect::ClearTranscript));
        assert_eq!(scheduler.status(), RunStatus::Running);
        assert_eq!(scheduler.turn_count(), 0);

        // The request from the paused run is now stale
        assert!(scheduler.on_turn(stale.ticket(), turn(0)).is_empty());
    }

    #[test]
    fn test_reset_discards_stale_responses() {
        let mut scheduler = TurnScheduler::default();
        let next = running(&mut scheduler);
        scheduler.on_turn(next.ticket(), turn(0));

        let effects = scheduler.reset();
        assert!(effects.contains(&Effect::ClearTranscript));
        assert!(effects.contains(&Effect::ResetSession));
        assert_eq!(scheduler.status(), RunStatus::Idle);
        assert_eq!(scheduler.turn_count(), 0);

        // Late arrivals from before the reset never append
        assert!(scheduler.on_turn(next.ticket(), turn(1)).is_empty());
        assert!(scheduler
            .on_initialized(next.ticket(), Ok(vec![Message::new("Moderator", "x")]))
            .is_empty());
        assert!(scheduler.on_delay_elapsed(next.ticket()).is_empty());
        assert_eq!(scheduler.turn_count(), 0);
    }

    #[test]
    fn test_reset_hides_pending_indicator() {
        let mut scheduler = TurnScheduler::default();
        running(&mut scheduler);
        assert!(scheduler.is_pending());

        let effects = scheduler.reset();
        assert!(effects.contains(&Effect::HidePending));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_reset_from_idle() {
        let mut scheduler = TurnScheduler::default();
        let effects = scheduler.reset();
        assert_eq!(
            effects,
            vec![Effect::ClearTranscript, Effect::ResetSession]
        );
        assert_eq!(scheduler.generation(), 1);
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }
}
