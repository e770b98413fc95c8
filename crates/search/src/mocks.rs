//! Mock implementations of search traits for testing without an ITP or agent.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use agent::CandidateOutput;
use async_trait::async_trait;
use isa_client::{ItpError, ProofState, StepResult};

use crate::engine::{Agent, SearchError, StateLifecycleManager};
use crate::validate::is_discharge_command;

/// Convenience constructor for a `CandidateOutput`.
pub fn make_candidate(command: &str, logit: f64) -> CandidateOutput {
    CandidateOutput::with_logit(command, logit)
}

/// Convenience constructor for a `ProofState` with an empty message.
pub fn make_state(id: &str, result: StepResult, level: u32, state_text: &str) -> ProofState {
    ProofState {
        id: id.to_string(),
        result,
        message: String::new(),
        proof_level: level,
        state_text: state_text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockAgent
// ---------------------------------------------------------------------------

/// Mock agent that returns canned candidates based on the prompt text.
pub struct MockAgent {
    responses: HashMap<String, Vec<CandidateOutput>>,
    default_responses: Vec<CandidateOutput>,
    queries: Mutex<Vec<String>>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    /// Create an empty mock agent with no responses.
    pub fn new() -> Self {
        Self::with_default(Vec::new())
    }

    /// Create a mock agent that answers every prompt with `candidates`.
    pub fn with_default(candidates: Vec<CandidateOutput>) -> Self {
        Self {
            responses: HashMap::new(),
            default_responses: candidates,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Add a canned response for an exact prompt match.
    pub fn add_response(&mut self, prompt: &str, candidates: Vec<CandidateOutput>) {
        self.responses.insert(prompt.to_string(), candidates);
    }

    /// Every prompt queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn query(&self, prompt: &str, n: usize) -> Result<Vec<CandidateOutput>, SearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(prompt.to_string());
        }
        let canned = self
            .responses
            .get(prompt)
            .unwrap_or(&self.default_responses);
        Ok(canned.iter().take(n).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// A call received by [`MockSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Execute {
        state_id: String,
        command: String,
        timeout: u64,
    },
    ExecuteBatch {
        state_id: String,
        commands: Vec<String>,
        timeout: u64,
    },
    Discharge {
        state_id: String,
        timeout: u64,
        extended_timeout: u64,
    },
    Remove {
        state_id: String,
    },
    CloneAndRename {
        source_id: String,
        dest_id: String,
    },
}

/// Mock session answering from canned `(state_id, command)` responses.
///
/// Unknown commands produce a `FAILURE` state with a fresh id. Every call is
/// recorded for later assertions.
pub struct MockSession {
    responses: HashMap<(String, String), ProofState>,
    discharges: HashMap<String, ProofState>,
    unavailable: HashSet<String>,
    truncate_batches: bool,
    next_id: AtomicU64,
    calls: Mutex<Vec<SessionCall>>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            discharges: HashMap::new(),
            unavailable: HashSet::new(),
            truncate_batches: false,
            next_id: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Canned result of running `command` (trimmed) against `state_id`.
    pub fn add_response(&mut self, state_id: &str, command: &str, state: ProofState) {
        self.responses
            .insert((state_id.to_string(), command.trim().to_string()), state);
    }

    /// Canned result of a discharge search on `state_id`.
    pub fn add_discharge(&mut self, state_id: &str, state: ProofState) {
        self.discharges.insert(state_id.to_string(), state);
    }

    /// Answer with a transient error whenever `command` is run.
    ///
    /// Use the discharge token to make discharge searches fail.
    pub fn fail_on(&mut self, command: &str) {
        self.unavailable.insert(command.trim().to_string());
    }

    /// Drop the last state of every batch answer.
    pub fn truncate_batches(&mut self, truncate: bool) {
        self.truncate_batches = truncate;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Ids passed to `remove`, in order.
    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SessionCall::Remove { state_id } => Some(state_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SessionCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn fresh_id(&self) -> String {
        format!("tmp{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn respond(&self, state_id: &str, command: &str) -> Result<ProofState, SearchError> {
        let command = command.trim();
        if self.unavailable.contains(command) {
            return Err(ItpError::Unavailable(format!("mock outage on '{command}'")).into());
        }
        let key = (state_id.to_string(), command.to_string());
        Ok(match self.responses.get(&key) {
            Some(state) => state.clone(),
            None => ProofState {
                id: self.fresh_id(),
                result: StepResult::Failure,
                message: format!("unknown command '{command}' at state {state_id}"),
                proof_level: 1,
                state_text: String::new(),
            },
        })
    }
}

#[async_trait]
impl StateLifecycleManager for MockSession {
    async fn execute_one(
        &self,
        state_id: &str,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ProofState, SearchError> {
        self.record(SessionCall::Execute {
            state_id: state_id.to_string(),
            command: command.to_string(),
            timeout: timeout_secs,
        });
        self.respond(state_id, command)
    }

    async fn execute_batch(
        &self,
        state_id: &str,
        commands: &[String],
        timeout_secs: u64,
    ) -> Result<Vec<ProofState>, SearchError> {
        self.record(SessionCall::ExecuteBatch {
            state_id: state_id.to_string(),
            commands: commands.to_vec(),
            timeout: timeout_secs,
        });
        let mut states = commands
            .iter()
            .map(|c| self.respond(state_id, c))
            .collect::<Result<Vec<_>, _>>()?;
        if self.truncate_batches {
            states.pop();
        }
        Ok(states)
    }

    async fn discharge_search(
        &self,
        state_id: &str,
        timeout_secs: u64,
        extended_timeout_secs: u64,
    ) -> Result<ProofState, SearchError> {
        self.record(SessionCall::Discharge {
            state_id: state_id.to_string(),
            timeout: timeout_secs,
            extended_timeout: extended_timeout_secs,
        });
        if self.unavailable.iter().any(|c| is_discharge_command(c)) {
            return Err(ItpError::Unavailable("mock discharge outage".to_string()).into());
        }
        Ok(match self.discharges.get(state_id) {
            Some(state) => state.clone(),
            None => ProofState {
                id: self.fresh_id(),
                result: StepResult::Failure,
                message: "no proof found".to_string(),
                proof_level: 1,
                state_text: String::new(),
            },
        })
    }

    async fn remove(&self, state_id: &str) -> Result<(), SearchError> {
        self.record(SessionCall::Remove {
            state_id: state_id.to_string(),
        });
        Ok(())
    }

    async fn clone_and_rename(
        &self,
        source_id: &str,
        dest_id: &str,
    ) -> Result<ProofState, SearchError> {
        self.record(SessionCall::CloneAndRename {
            source_id: source_id.to_string(),
            dest_id: dest_id.to_string(),
        });
        Ok(make_state(dest_id, StepResult::Success, 0, ""))
    }
}
