//! Scripted in-memory turn service for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::message::Message;
use crate::service::{ServiceError, StartRequest, TurnReply, TurnService};

/// One scripted answer to a turn request.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Message(Message),
    /// Explicit error payload.
    Error(String),
    /// Transport failure.
    Transport(String),
}

#[derive(Debug, Default)]
struct Calls {
    initialize: usize,
    next_turn: usize,
    reset: usize,
    topics: Vec<String>,
}

/// Turn service answering from a script.
///
/// Once the script runs out, turns alternate between "Model A" and
/// "Model B" with the text `turn N`.
#[derive(Debug)]
pub struct ScriptedService {
    history: Vec<Message>,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    initialize_error: Option<String>,
    reset_error: Option<String>,
    calls: Mutex<Calls>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedService {
    /// Service whose initialization returns a moderator line for the topic.
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            turns: Mutex::new(VecDeque::new()),
            initialize_error: None,
            reset_error: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Fixed history returned by every initialization.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Answers for the next turn requests, in order.
    #[must_use]
    pub fn with_turns(self, turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        self.turns.lock().unwrap().extend(turns);
        self
    }

    #[must_use]
    pub fn failing_initialize(mut self, error: impl Into<String>) -> Self {
        self.initialize_error = Some(error.into());
        self
    }

    #[must_use]
    pub fn failing_reset(mut self, error: impl Into<String>) -> Self {
        self.reset_error = Some(error.into());
        self
    }

    pub fn initialize_calls(&self) -> usize {
        self.calls.lock().unwrap().initialize
    }

    pub fn next_turn_calls(&self) -> usize {
        self.calls.lock().unwrap().next_turn
    }

    pub fn reset_calls(&self) -> usize {
        self.calls.lock().unwrap().reset
    }

    /// Topics passed to every initialization, in order.
    pub fn topics(&self) -> Vec<String> {
        self.calls.lock().unwrap().topics.clone()
    }
}

#[async_trait]
impl TurnService for ScriptedService {
    async fn initialize(&self, request: &StartRequest) -> Result<Vec<Message>, ServiceError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.initialize += 1;
            calls.topics.push(request.topic.clone());
        }
        if let Some(error) = &self.initialize_error {
            return Err(ServiceError::Unavailable(error.clone()));
        }
        if self.history.is_empty() {
            Ok(vec![Message::new(
                "Moderator",
                format!("Topic: {}", request.topic),
            )
            .with_model("System")])
        } else {
            Ok(self.history.clone())
        }
    }

    async fn next_turn(&self) -> Result<TurnReply, ServiceError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.next_turn += 1;
            calls.next_turn
        };
        let scripted = self.turns.lock().unwrap().pop_front();
        match scripted {
            Some(ScriptedTurn::Message(message)) => Ok(TurnReply::Message(message)),
            Some(ScriptedTurn::Error(error)) => Ok(TurnReply::Error(error)),
            Some(ScriptedTurn::Transport(error)) => Err(ServiceError::Unavailable(error)),
            None => {
                let speaker = if n % 2 == 1 { "Model A" } else { "Model B" };
                Ok(TurnReply::Message(Message::new(speaker, format!("turn {n}"))))
            }
        }
    }

    async fn reset_session(&self) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().reset += 1;
        match &self.reset_error {
            Some(error) => Err(ServiceError::Unavailable(error.clone())),
            None => Ok(()),
        }
    }
}
