//! Configuration and data types for the agent crate.

use serde::{Deserialize, Deserializer, Serialize};

/// Errors from the agent server.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport failure or 5xx from the agent server.
    #[error("Agent unavailable: {0}")]
    Unavailable(String),
    /// Response body did not match the expected format.
    #[error("Agent protocol error: {0}")]
    Protocol(String),
    /// The configured server URL could not be parsed.
    #[error("Invalid agent URL: {0}")]
    InvalidUrl(String),
}

/// A candidate next command proposed by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutput {
    /// Command text, as generated (may carry surrounding whitespace).
    pub command: String,
    /// Unnormalized confidence. Higher is better; unset means `+inf`.
    #[serde(default = "unset_logit", deserialize_with = "logit_or_unset")]
    pub logit: f64,
}

fn unset_logit() -> f64 {
    f64::INFINITY
}

fn logit_or_unset<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
}

impl CandidateOutput {
    /// A candidate with no confidence score (ranked first).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            logit: unset_logit(),
        }
    }

    pub fn with_logit(command: impl Into<String>, logit: f64) -> Self {
        Self {
            command: command.into(),
            logit,
        }
    }
}

/// Configuration for [`crate::AgentClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent server (e.g. `http://localhost:30000`).
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:30000".to_string()
}
fn default_timeout() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_logit_is_infinite() {
        let c = CandidateOutput::new("by auto");
        assert!(c.logit.is_infinite() && c.logit > 0.0);
    }

    #[test]
    fn test_deserialize_missing_logit() {
        let c: CandidateOutput = serde_json::from_str(r#"{"command": "by simp"}"#).unwrap();
        assert_eq!(c.command, "by simp");
        assert_eq!(c.logit, f64::INFINITY);
    }

    #[test]
    fn test_deserialize_null_logit() {
        let c: CandidateOutput =
            serde_json::from_str(r#"{"command": "by simp", "logit": null}"#).unwrap();
        assert_eq!(c.logit, f64::INFINITY);
    }

    #[test]
    fn test_deserialize_logit() {
        let c: CandidateOutput =
            serde_json::from_str(r#"{"command": "by blast", "logit": -1.25}"#).unwrap();
        assert!((c.logit - (-1.25)).abs() < 1e-12);
    }

    #[test]
    fn test_agent_config_defaults() {
        let cfg: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.server_url, "http://localhost:30000");
        assert_eq!(cfg.timeout_secs, 120);
    }
}
