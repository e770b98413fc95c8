//! Bridges between search traits and the HTTP clients (isa-client, agent).

use agent::{AgentClient, CandidateOutput};
use async_trait::async_trait;
use isa_client::{IsaClient, ProofState};

use crate::engine::{Agent, SearchError, StateLifecycleManager};

// ---------------------------------------------------------------------------
// FixedAgent — proposes the same commands for every state
// ---------------------------------------------------------------------------

/// An agent that answers every prompt with a fixed command list.
///
/// Used as a baseline without an agent server, e.g. a `sledgehammer`-only run.
/// Candidates carry no logit, so their order is kept.
#[derive(Debug, Clone)]
pub struct FixedAgent {
    commands: Vec<String>,
}

impl FixedAgent {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl Agent for FixedAgent {
    async fn query(&self, _prompt: &str, n: usize) -> Result<Vec<CandidateOutput>, SearchError> {
        Ok(self
            .commands
            .iter()
            .take(n)
            .map(|c| CandidateOutput::new(c.as_str()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// StateLifecycleManager for IsaClient
// ---------------------------------------------------------------------------

#[async_trait]
impl StateLifecycleManager for IsaClient {
    async fn execute_one(
        &self,
        state_id: &str,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ProofState, SearchError> {
        Ok(self.execute(state_id, command, timeout_secs).await?)
    }

    async fn execute_batch(
        &self,
        state_id: &str,
        commands: &[String],
        timeout_secs: u64,
    ) -> Result<Vec<ProofState>, SearchError> {
        Ok(self.execute_many(state_id, commands, timeout_secs).await?)
    }

    async fn discharge_search(
        &self,
        state_id: &str,
        timeout_secs: u64,
        extended_timeout_secs: u64,
    ) -> Result<ProofState, SearchError> {
        Ok(self
            .call_sledgehammer(state_id, timeout_secs, extended_timeout_secs)
            .await?)
    }

    async fn remove(&self, state_id: &str) -> Result<(), SearchError> {
        Ok(self.remove_state(state_id).await?)
    }

    async fn clone_and_rename(
        &self,
        source_id: &str,
        dest_id: &str,
    ) -> Result<ProofState, SearchError> {
        Ok(self.clear_and_rename_state(source_id, dest_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Agent for AgentClient
// ---------------------------------------------------------------------------

#[async_trait]
impl Agent for AgentClient {
    async fn query(&self, prompt: &str, n: usize) -> Result<Vec<CandidateOutput>, SearchError> {
        AgentClient::query(self, prompt, n)
            .await
            .map_err(|e| SearchError::Agent(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent::AgentConfig;
    use isa_client::ClientConfig;

    fn dead_session() -> IsaClient {
        IsaClient::connect(ClientConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fixed_agent() {
        let agent = FixedAgent::new(vec!["sledgehammer".into(), "by auto".into()]);
        let out = agent.query("any goal", 16).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].command, "sledgehammer");
        assert_eq!(out[0].logit, f64::INFINITY);
        assert_eq!(agent.query("any goal", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_session_outage_is_transient() {
        let session = dead_session();
        let err = StateLifecycleManager::remove(&session, "s1").await.unwrap_err();
        assert!(matches!(err, SearchError::Session(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_batch_through_adapter() {
        let session = dead_session();
        let states = session.execute_batch("default", &[], 10).await.unwrap();
        assert!(states.is_empty());
    }

    #[tokio::test]
    async fn test_agent_outage_is_transient() {
        let client = AgentClient::new(AgentConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
        })
        .unwrap();
        let err = Agent::query(&client, "goal", 4).await.unwrap_err();
        assert!(matches!(err, SearchError::Agent(_)));
        assert!(err.is_transient());
    }
}
