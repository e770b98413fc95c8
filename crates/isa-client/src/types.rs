use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Canonical state id the session reuses for the current lemma's root goal.
pub const DEFAULT_STATE_ID: &str = "default";

/// Isabelle commands that open a proof obligation.
///
/// A theory's command stream is split into lemma groups at these names.
pub const ISA_PROOF_COMMANDS: &[&str] = &[
    "lemma",
    "theorem",
    "corollary",
    "proposition",
    "schematic_goal",
    "interpretation",
    "global_interpretation",
    "sublocale",
    "instance",
    "notepad",
    "function",
    "termination",
    "specification",
    "old_rep_datatype",
    "typedef",
    "functor",
    "quotient_type",
    "lift_definition",
    "quotient_definition",
    "bnf",
    "subclass",
];

/// Whether a parsed command name starts a new proof obligation.
pub fn is_proof_command(name: &str) -> bool {
    ISA_PROOF_COMMANDS.contains(&name)
}

/// Errors that can occur while talking to the session service.
#[derive(Debug, thiserror::Error)]
pub enum ItpError {
    /// Connection refused, request timed out, or the service reported 503.
    #[error("ITP service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success HTTP status.
    #[error("ITP service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    /// The response body did not match the expected wire format.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The configured server URL could not be parsed or joined.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ItpError {
    /// Transient errors mean the unit of work should be abandoned, not that
    /// the interaction with the prover is unsound.
    pub fn is_transient(&self) -> bool {
        matches!(self, ItpError::Unavailable(_) | ItpError::Service { .. })
    }
}

/// Outcome of running a command against a proof state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepResult {
    Success,
    Failure,
    Timeout,
    Error,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A snapshot of a named proof state held by the session service.
///
/// The service owns the state itself; this is the locally cached copy
/// returned by the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofState {
    /// Session-scoped state name.
    pub id: String,
    /// Outcome of the command that produced this state.
    pub result: StepResult,
    /// Diagnostic text (error message, or the proof found by a discharge search).
    pub message: String,
    /// Proof nesting depth. Zero means the goal is fully discharged.
    pub proof_level: u32,
    /// Pretty-printed prover state.
    pub state_text: String,
}

impl ProofState {
    pub fn is_success(&self) -> bool {
        self.result == StepResult::Success
    }

    /// Whether no proof obligation remains open.
    pub fn proof_is_finished(&self) -> bool {
        self.proof_level == 0
    }

    /// One-line text for log output: the state on success, the message otherwise.
    pub fn logging_info(&self) -> String {
        let text = if self.is_success() {
            &self.state_text
        } else {
            &self.message
        };
        text.replace('\n', " ")
    }
}

/// One command of a parsed theory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheoryCommand {
    /// Full source text of the command.
    pub text: String,
    /// Command keyword (e.g. `lemma`, `by`, `end`).
    pub name: String,
    /// Line in the theory file where the command starts.
    pub line: u32,
}

/// Parameters for starting an Isabelle session on the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IsaSetup {
    /// Isabelle installation directory.
    pub isa_path: PathBuf,
    /// Session (heap) to build and load.
    pub session: String,
    /// Directory theories are resolved against.
    pub working_directory: PathBuf,
    /// Extra directory searched for session ROOT files.
    #[serde(default)]
    pub session_roots: Option<PathBuf>,
}

/// Configuration for [`crate::IsaClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the session service (e.g. `http://localhost:8980`).
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Seconds added to the ITP-side timeout before the HTTP request gives up.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,

    /// HTTP timeout for `/setup`, which builds the session heap.
    #[serde(default = "default_setup_timeout")]
    pub setup_timeout_secs: u64,

    /// TCP connect timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8980".to_string()
}
fn default_grace_secs() -> u64 {
    30
}
fn default_setup_timeout() -> u64 {
    900
}
fn default_connect_timeout() -> u64 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            grace_secs: default_grace_secs(),
            setup_timeout_secs: default_setup_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}
