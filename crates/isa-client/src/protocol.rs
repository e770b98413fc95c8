//! JSON wire messages exchanged with the session service.
//!
//! Every request has its own `Serialize` payload; every response is decoded
//! explicitly into the matching domain record.

use serde::{Deserialize, Serialize};

use crate::types::{IsaSetup, ItpError, ProofState, StepResult, TheoryCommand};

/// Endpoint paths, relative to the service base URL.
pub mod endpoint {
    pub const SETUP: &str = "setup";
    pub const CLOSE: &str = "close";
    pub const PROCEED_UNTIL: &str = "proceed_until";
    pub const EXECUTE: &str = "execute";
    pub const EXECUTE_MANY: &str = "execute_many";
    pub const SLEDGEHAMMER: &str = "sledgehammer";
    pub const CLONE: &str = "clone";
    pub const REMOVE: &str = "remove";
    pub const CLEAR_AND_RENAME: &str = "clear_and_rename";
    pub const THEORY_COMMANDS: &str = "theory_commands";
}

// --- Requests ---

#[derive(Debug, Clone, Serialize)]
pub struct SetupRequest {
    pub isa_path: String,
    pub session: String,
    pub working_directory: String,
    /// Empty when no extra session roots are configured.
    pub session_roots: String,
}

impl From<&IsaSetup> for SetupRequest {
    fn from(setup: &IsaSetup) -> Self {
        Self {
            isa_path: setup.isa_path.display().to_string(),
            session: setup.session.clone(),
            working_directory: setup.working_directory.display().to_string(),
            session_roots: setup
                .session_roots
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmptyRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct TheoryContent {
    pub theory: String,
    pub content: String,
    pub timeout: u64,
}

/// A command (or command sequence) to run against a named state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofCommands {
    pub id: String,
    pub commands: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofCommandsBatch {
    pub requests: Vec<ProofCommands>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SledgehammerRequest {
    pub id: String,
    pub timeout: u64,
    pub sledgehammer_timeout: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearAndRenameRequest {
    pub id: String,
    pub new_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseRequest {
    pub theory: String,
    pub only_statements: bool,
    pub remove_ignored: bool,
}

// --- Responses ---

/// Wire form of a proof state.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeState {
    pub id: String,
    pub result: StepResult,
    #[serde(default)]
    pub message: String,
    pub level: u32,
    #[serde(default)]
    pub state: String,
}

impl From<OutcomeState> for ProofState {
    fn from(wire: OutcomeState) -> Self {
        ProofState {
            id: wire.id,
            result: wire.result,
            message: wire.message,
            proof_level: wire.level,
            state_text: wire.state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeStates {
    pub states: Vec<OutcomeState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTheoryCommand {
    pub command: String,
    pub name: String,
    #[serde(default)]
    pub line: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TheoryCommands {
    pub commands: Vec<WireTheoryCommand>,
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8], what: &str) -> Result<T, ItpError> {
    serde_json::from_slice(body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(body).chars().take(200).collect();
        ItpError::Protocol(format!("Failed to parse {what} response: {e}. Raw: {preview}"))
    })
}

/// Decode a single `OutcomeState` body.
pub fn decode_state(body: &[u8]) -> Result<ProofState, ItpError> {
    let wire: OutcomeState = decode(body, "state")?;
    Ok(wire.into())
}

/// Decode an `execute_many` body, checking it has one state per request.
pub fn decode_states(body: &[u8], expected: usize) -> Result<Vec<ProofState>, ItpError> {
    let wire: OutcomeStates = decode(body, "execute_many")?;
    if wire.states.len() != expected {
        return Err(ItpError::Protocol(format!(
            "execute_many returned {} states for {} commands",
            wire.states.len(),
            expected
        )));
    }
    Ok(wire.states.into_iter().map(ProofState::from).collect())
}

/// Decode a `theory_commands` body.
pub fn decode_theory_commands(body: &[u8]) -> Result<Vec<TheoryCommand>, ItpError> {
    let wire: TheoryCommands = decode(body, "theory_commands")?;
    Ok(wire
        .commands
        .into_iter()
        .map(|c| TheoryCommand {
            text: c.command,
            name: c.name,
            line: c.line,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn serialize_setup_without_roots() {
        let setup = IsaSetup {
            isa_path: PathBuf::from("/opt/Isabelle2023"),
            session: "Completeness".to_string(),
            working_directory: PathBuf::from("/thys/Completeness"),
            session_roots: None,
        };
        let json = serde_json::to_value(SetupRequest::from(&setup)).unwrap();
        assert_eq!(json["isa_path"], "/opt/Isabelle2023");
        assert_eq!(json["session"], "Completeness");
        assert_eq!(json["working_directory"], "/thys/Completeness");
        assert_eq!(json["session_roots"], "");
    }

    #[test]
    fn serialize_setup_with_roots() {
        let setup = IsaSetup {
            isa_path: PathBuf::from("/opt/Isabelle2023"),
            session: "HOL".to_string(),
            working_directory: PathBuf::from("/thys"),
            session_roots: Some(PathBuf::from("/afp/thys")),
        };
        let json = serde_json::to_value(SetupRequest::from(&setup)).unwrap();
        assert_eq!(json["session_roots"], "/afp/thys");
    }

    #[test]
    fn serialize_batch() {
        let batch = ProofCommandsBatch {
            requests: vec![
                ProofCommands {
                    id: "s0".into(),
                    commands: "by auto".into(),
                    timeout: 10,
                },
                ProofCommands {
                    id: "s0".into(),
                    commands: "by blast".into(),
                    timeout: 10,
                },
            ],
        };
        let json = serde_json::to_value(&batch).unwrap();
        let reqs = json["requests"].as_array().unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0]["id"], "s0");
        assert_eq!(reqs[1]["commands"], "by blast");
        assert_eq!(reqs[1]["timeout"], 10);
    }

    #[test]
    fn serialize_sledgehammer() {
        let req = SledgehammerRequest {
            id: "default".into(),
            timeout: 10,
            sledgehammer_timeout: 30,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], "default");
        assert_eq!(json["timeout"], 10);
        assert_eq!(json["sledgehammer_timeout"], 30);
    }

    #[test]
    fn serialize_clear_and_rename() {
        let req = ClearAndRenameRequest {
            id: "s7".into(),
            new_id: "default".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], "s7");
        assert_eq!(json["new_id"], "default");
    }

    #[test]
    fn decode_success_state() {
        let body = br#"{"id":"s3","result":"SUCCESS","message":"","level":1,"state":"proof (prove)\ngoal (1 subgoal):\n 1. q"}"#;
        let state = decode_state(body).unwrap();
        assert_eq!(state.id, "s3");
        assert_eq!(state.result, StepResult::Success);
        assert_eq!(state.proof_level, 1);
        assert!(state.state_text.contains("1 subgoal"));
    }

    #[test]
    fn decode_state_missing_optional_fields() {
        let body = br#"{"id":"s4","result":"TIMEOUT","level":2}"#;
        let state = decode_state(body).unwrap();
        assert_eq!(state.result, StepResult::Timeout);
        assert!(state.message.is_empty());
        assert!(state.state_text.is_empty());
    }

    #[test]
    fn decode_state_rejects_unknown_result() {
        let body = br#"{"id":"s4","result":"MAYBE","level":2}"#;
        let err = decode_state(body).unwrap_err();
        assert!(matches!(err, ItpError::Protocol(_)));
    }

    #[test]
    fn decode_malformed_json() {
        let err = decode_state(b"not valid json {{{").unwrap_err();
        assert!(err.to_string().contains("Failed to parse state response"));
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_states_checks_length() {
        let body = br#"{"states":[{"id":"a","result":"SUCCESS","level":0}]}"#;
        assert_eq!(decode_states(body, 1).unwrap().len(), 1);
        let err = decode_states(body, 2).unwrap_err();
        assert!(err.to_string().contains("1 states for 2 commands"));
    }

    #[test]
    fn decode_states_preserves_order() {
        let body = br#"{"states":[
            {"id":"a","result":"FAILURE","message":"no","level":1},
            {"id":"b","result":"SUCCESS","level":1},
            {"id":"c","result":"ERROR","message":"bad","level":1}
        ]}"#;
        let states = decode_states(body, 3).unwrap();
        let ids: Vec<&str> = states.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn decode_theory_commands_body() {
        let body = br#"{"commands":[
            {"command":"theory Test imports Main begin","name":"theory","line":1},
            {"command":"lemma test: \"p ==> p\"","name":"lemma","line":3},
            {"command":"by simp","name":"by","line":4},
            {"command":"end","name":"end","line":6}
        ]}"#;
        let cmds = decode_theory_commands(body).unwrap();
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[1].name, "lemma");
        assert_eq!(cmds[1].line, 3);
        assert_eq!(cmds[3].text, "end");
    }
}
