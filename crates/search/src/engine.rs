//! Best-first search engine with a bounded frontier and budget accounting.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agent::{AgentError, CandidateOutput};
use async_trait::async_trait;
use isa_client::{ItpError, ProofState, StepResult};
use tracing::Instrument;

use crate::config::SearchConfig;
use crate::filter::{filter_agent_outputs, sort_by_confidence};
use crate::frontier::Frontier;
use crate::node::SearchNode;
use crate::summary::{FailureReason, SearchSummary};
use crate::validate::{is_discharge_command, validate_batch};

/// Errors that can occur during proof search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Error from the ITP session service.
    #[error("Session error: {0}")]
    Session(#[from] ItpError),
    /// Error from the candidate-generating agent.
    #[error("Agent error: {0}")]
    Agent(#[source] anyhow::Error),
    /// The session or agent broke a guarantee the search relies on.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl SearchError {
    /// Whether the unit of work should be abandoned rather than the whole run.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Session(e) => e.is_transient(),
            SearchError::Agent(e) => matches!(
                e.downcast_ref::<AgentError>(),
                Some(AgentError::Unavailable(_))
            ),
            SearchError::Invariant(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Source of candidate next commands for a proof state.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Up to `n` candidates for `prompt`. An empty list is a valid answer.
    async fn query(&self, prompt: &str, n: usize) -> Result<Vec<CandidateOutput>, SearchError>;
}

/// Operations on named proof states held by a remote session.
///
/// The session owns every state; the search only passes ids around.
#[async_trait]
pub trait StateLifecycleManager: Send + Sync {
    /// Run one command against `state_id`.
    async fn execute_one(
        &self,
        state_id: &str,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ProofState, SearchError>;

    /// Run each command against `state_id`, one child state per command in order.
    async fn execute_batch(
        &self,
        state_id: &str,
        commands: &[String],
        timeout_secs: u64,
    ) -> Result<Vec<ProofState>, SearchError>;

    /// Run a discharge search on `state_id`.
    async fn discharge_search(
        &self,
        state_id: &str,
        timeout_secs: u64,
        extended_timeout_secs: u64,
    ) -> Result<ProofState, SearchError>;

    /// Release `state_id`.
    async fn remove(&self, state_id: &str) -> Result<(), SearchError>;

    /// Move `source_id` onto `dest_id`, overwriting it.
    async fn clone_and_rename(
        &self,
        source_id: &str,
        dest_id: &str,
    ) -> Result<ProofState, SearchError>;
}

/// Prover-specific hooks: how a state becomes a prompt, and how an accepted
/// candidate is recorded in the proof.
pub trait SearchFlavor: Send + Sync {
    fn make_input(&self, state: &ProofState) -> String {
        state.state_text.clone()
    }

    fn proof_step(&self, candidate: &CandidateOutput, _child: &ProofState) -> String {
        candidate.command.clone()
    }
}

/// Prompt is the state text, proof step is the command as generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFlavor;

impl SearchFlavor for PlainFlavor {}

/// Like [`PlainFlavor`], but a discharge token is recorded as the proof text
/// the discharge search found (the child's message), so proofs replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsabelleFlavor;

impl SearchFlavor for IsabelleFlavor {
    fn proof_step(&self, candidate: &CandidateOutput, child: &ProofState) -> String {
        if is_discharge_command(&candidate.command) {
            child.message.clone()
        } else {
            candidate.command.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// SearchEngine
// ---------------------------------------------------------------------------

/// Result of a single search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub proved: bool,
    /// Commands from the root to a finished proof. Empty unless `proved`.
    pub proof_steps: Vec<String>,
    pub summary: SearchSummary,
}

/// Budgeted best-first proof search engine.
///
/// Holds only configuration, so one engine can drive many sequential searches.
#[derive(Clone)]
pub struct SearchEngine {
    config: SearchConfig,
    flavor: Arc<dyn SearchFlavor>,
}

impl SearchEngine {
    /// Create an engine with the Isabelle flavor.
    pub fn new(config: SearchConfig) -> Self {
        config.validate();
        tracing::info!(
            gen_length = config.gen_length,
            query_limit = config.query_limit,
            queue_length = config.queue_length,
            step_timeout_secs = config.step_timeout_secs,
            total_timeout_secs = config.total_timeout_secs,
            step_timeout_limit = config.step_timeout_limit,
            release_abandoned_states = config.release_abandoned_states,
            "Search engine configured"
        );
        Self {
            config,
            flavor: Arc::new(IsabelleFlavor),
        }
    }

    pub fn with_flavor(mut self, flavor: Arc<dyn SearchFlavor>) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for a command sequence that closes the goal held in `root`.
    ///
    /// On success the finished state is renamed onto `root.id`. On failure
    /// `root.id` is renamed onto itself before returning. Transient errors
    /// propagate and discard the search's progress.
    pub async fn solve(
        &self,
        root: &ProofState,
        agent: &dyn Agent,
        session: &dyn StateLifecycleManager,
        dedupe: bool,
    ) -> Result<SearchOutcome, SearchError> {
        self.solve_labeled(root, agent, session, dedupe, "").await
    }

    /// [`solve`](Self::solve) inside a span tagged with `label` (e.g. the lemma).
    pub async fn solve_labeled(
        &self,
        root: &ProofState,
        agent: &dyn Agent,
        session: &dyn StateLifecycleManager,
        dedupe: bool,
        label: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let span = tracing::info_span!("search", lemma = label, root = %root.id);
        self.run(root, agent, session, dedupe).instrument(span).await
    }

    async fn run(
        &self,
        root: &ProofState,
        agent: &dyn Agent,
        session: &dyn StateLifecycleManager,
        dedupe: bool,
    ) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let total_budget = Duration::from_secs(self.config.total_timeout_secs);
        let release = self.config.release_abandoned_states;
        let mut summary = SearchSummary::default();

        tracing::info!(state = %root.logging_info(), "Start solving");

        let mut frontier = Frontier::new(self.config.queue_length);
        frontier.seed(SearchNode::root(root.clone()));
        summary.peak_frontier_size = frontier.len();

        let mut seen_prompts: HashSet<String> = HashSet::new();
        let mut proof: Option<Vec<String>> = None;
        let mut elapsed = Duration::ZERO;

        while !frontier.is_empty()
            && summary.query_count < self.config.query_limit
            && summary.timeout_count < self.config.step_timeout_limit
        {
            elapsed = start.elapsed();
            if elapsed > total_budget {
                break;
            }
            let Some(node) = frontier.pop() else {
                break;
            };

            let prompt = self.flavor.make_input(&node.state);
            if dedupe && seen_prompts.contains(&prompt) {
                summary.duplicates_skipped += 1;
                tracing::debug!(state_id = node.state_id(), "Skipping duplicate prompt");
                if release {
                    session.remove(node.state_id()).await?;
                }
                continue;
            }
            seen_prompts.insert(prompt.clone());
            summary.query_count += 1;
            tracing::info!(
                query = summary.query_count,
                score = node.score,
                depth = node.depth(),
                "[QUERY-{}] {}",
                summary.query_count,
                prompt.replace('\n', " ")
            );

            let agent_start = Instant::now();
            let outputs = agent.query(&prompt, self.config.gen_length).await?;
            summary.agent_time_ms += agent_start.elapsed().as_millis() as u64;

            let itp_start = Instant::now();
            let total = outputs.len();
            let mut candidates = filter_agent_outputs(outputs);
            sort_by_confidence(&mut candidates);
            tracing::info!(
                query = summary.query_count,
                unique = candidates.len(),
                total,
                "[OUTPUTS-{}] {} / {} unique commands",
                summary.query_count,
                candidates.len(),
                total
            );

            let commands: Vec<String> = candidates
                .iter()
                .map(|c| c.command.trim().to_string())
                .collect();
            let children = validate_batch(
                session,
                node.state_id(),
                &commands,
                self.config.step_timeout_secs,
            )
            .await?;
            summary.itp_time_ms += itp_start.elapsed().as_millis() as u64;

            let mut pairs = children.into_iter().zip(candidates.iter());
            while let Some((child, candidate)) = pairs.next() {
                let step = self.flavor.proof_step(candidate, &child);
                summary.generated_count += 1;
                tracing::debug!(
                    result = %child.result,
                    logit = candidate.logit,
                    command = %step,
                    info = %child.logging_info(),
                    "Candidate executed"
                );

                if !child.is_success() {
                    session.remove(&child.id).await?;
                    if child.result == StepResult::Timeout {
                        summary.timeout_count += 1;
                        if summary.timeout_count >= self.config.step_timeout_limit {
                            tracing::info!(
                                timeouts = summary.timeout_count,
                                unprocessed = pairs.len(),
                                "Step timeout limit reached"
                            );
                            if release {
                                for (rest, _) in pairs.by_ref() {
                                    session.remove(&rest.id).await?;
                                }
                            }
                            break;
                        }
                    }
                    continue;
                }

                summary.succeeded_count += 1;
                let child_node = node.child(step, candidate.logit, child);

                if child_node.state.proof_is_finished() {
                    session
                        .clone_and_rename(child_node.state_id(), &root.id)
                        .await?;
                    proof = Some(child_node.proof_steps);
                    if release {
                        for (rest, _) in pairs.by_ref() {
                            session.remove(&rest.id).await?;
                        }
                    }
                    break;
                }

                if let Some(dropped) = frontier.push(child_node) {
                    summary.nodes_dropped += 1;
                    tracing::info!(
                        state_id = dropped.state_id(),
                        score = dropped.score,
                        "[DROPPING] {}",
                        dropped.state_id()
                    );
                    if release {
                        session.remove(dropped.state_id()).await?;
                    }
                }
                summary.peak_frontier_size = summary.peak_frontier_size.max(frontier.len());
            }

            if proof.is_some() {
                break;
            }
        }

        summary.total_time_ms = start.elapsed().as_millis() as u64;

        if let Some(proof_steps) = proof {
            tracing::info!(
                steps = proof_steps.len(),
                queries = summary.query_count,
                "[PROVED] {summary}"
            );
            tracing::info!("[PROOF]\n\t{}", proof_steps.join("\n\t"));
            return Ok(SearchOutcome {
                proved: true,
                proof_steps,
                summary,
            });
        }

        let reason = if frontier.is_empty() {
            FailureReason::EmptyQueue
        } else if summary.query_count >= self.config.query_limit {
            FailureReason::QueryLimit
        } else if summary.timeout_count >= self.config.step_timeout_limit {
            FailureReason::StepTimeoutLimit
        } else if elapsed > total_budget {
            FailureReason::Timeout
        } else {
            FailureReason::Unknown
        };
        summary.failure_reason = Some(reason);
        session.clone_and_rename(&root.id, &root.id).await?;

        tracing::info!(reason = %reason, "[FAILED] {summary}");
        Ok(SearchOutcome {
            proved: false,
            proof_steps: Vec::new(),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{make_candidate, make_state, MockAgent, MockSession, SessionCall};

    fn root() -> ProofState {
        make_state("default", StepResult::Success, 1, "goal (1 subgoal): 1. p ⟹ p")
    }

    #[tokio::test]
    async fn test_one_step_proof() {
        let mut session = MockSession::new();
        session.add_response("default", "by simp", make_state("s1", StepResult::Success, 0, ""));

        let mut agent = MockAgent::new();
        agent.add_response(&root().state_text, vec![make_candidate("by simp", -0.1)]);

        let engine = SearchEngine::new(SearchConfig::default());
        let outcome = engine.solve(&root(), &agent, &session, false).await.unwrap();

        assert!(outcome.proved);
        assert_eq!(outcome.proof_steps, vec!["by simp"]);
        assert_eq!(outcome.summary.query_count, 1);
        assert_eq!(outcome.summary.succeeded_count, 1);
        assert!(outcome.summary.failure_reason.is_none());
        assert!(session.calls().contains(&SessionCall::CloneAndRename {
            source_id: "s1".into(),
            dest_id: "default".into(),
        }));
    }

    #[tokio::test]
    async fn test_two_step_proof() {
        let mut session = MockSession::new();
        session.add_response(
            "default",
            "proof (rule impI)",
            make_state("s1", StepResult::Success, 2, "goal: p"),
        );
        session.add_response("s1", "assumption", make_state("s2", StepResult::Success, 1, ""));
        session.add_response("s2", "qed", make_state("s3", StepResult::Success, 0, ""));

        let mut agent = MockAgent::new();
        agent.add_response(&root().state_text, vec![make_candidate("proof (rule impI)", -0.3)]);
        agent.add_response("goal: p", vec![make_candidate("assumption", -0.1)]);
        agent.add_response("", vec![make_candidate("qed", -0.1)]);

        let engine = SearchEngine::new(SearchConfig::default());
        let outcome = engine.solve(&root(), &agent, &session, true).await.unwrap();

        assert!(outcome.proved);
        assert_eq!(outcome.proof_steps, vec!["proof (rule impI)", "assumption", "qed"]);
        assert_eq!(outcome.summary.query_count, 3);
    }

    #[tokio::test]
    async fn test_failed_children_are_removed() {
        let mut session = MockSession::new();
        session.add_response("default", "by auto", make_state("t1", StepResult::Timeout, 1, ""));
        // "by blast" falls through to the mock's FAILURE default.

        let agent = MockAgent::with_default(vec![
            make_candidate("by auto", 0.5),
            make_candidate("by blast", 0.1),
        ]);

        let engine = SearchEngine::new(SearchConfig::default());
        let outcome = engine.solve(&root(), &agent, &session, false).await.unwrap();

        assert!(!outcome.proved);
        assert!(outcome.proof_steps.is_empty());
        assert_eq!(outcome.summary.timeout_count, 1);
        assert_eq!(outcome.summary.generated_count, 2);
        assert_eq!(outcome.summary.succeeded_count, 0);
        assert_eq!(outcome.summary.failure_reason, Some(FailureReason::EmptyQueue));
        assert_eq!(session.removed().len(), 2);
        assert!(session.removed().contains(&"t1".to_string()));
        // Housekeeping rename of the root onto itself.
        assert_eq!(
            session.calls().last(),
            Some(&SessionCall::CloneAndRename {
                source_id: "default".into(),
                dest_id: "default".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_empty_agent_output() {
        let session = MockSession::new();
        let agent = MockAgent::new();

        let engine = SearchEngine::new(SearchConfig::default());
        let outcome = engine.solve(&root(), &agent, &session, false).await.unwrap();

        assert!(!outcome.proved);
        assert_eq!(outcome.summary.query_count, 1);
        assert_eq!(outcome.summary.generated_count, 0);
        assert_eq!(outcome.summary.failure_reason, Some(FailureReason::EmptyQueue));
        // No batch call for an empty candidate list.
        assert!(!session
            .calls()
            .iter()
            .any(|c| matches!(c, SessionCall::ExecuteBatch { .. })));
    }

    #[tokio::test]
    async fn test_zero_query_limit() {
        let session = MockSession::new();
        let agent = MockAgent::new();
        let config = SearchConfig {
            query_limit: 0,
            ..SearchConfig::default()
        };
        let outcome = SearchEngine::new(config)
            .solve(&root(), &agent, &session, false)
            .await
            .unwrap();
        assert_eq!(outcome.summary.query_count, 0);
        assert_eq!(outcome.summary.failure_reason, Some(FailureReason::QueryLimit));
        assert!(agent.queries().is_empty());
    }

    #[tokio::test]
    async fn test_zero_total_timeout_never_expands() {
        let session = MockSession::new();
        let agent = MockAgent::new();
        let config = SearchConfig {
            total_timeout_secs: 0,
            ..SearchConfig::default()
        };
        let outcome = SearchEngine::new(config)
            .solve(&root(), &agent, &session, false)
            .await
            .unwrap();
        // Elapsed time is almost never exactly zero; either way no work is
        // done beyond a single query.
        assert!(outcome.summary.query_count <= 1);
        if outcome.summary.query_count == 0 {
            assert_eq!(outcome.summary.failure_reason, Some(FailureReason::Timeout));
        }
    }

    #[tokio::test]
    async fn test_isabelle_flavor_records_discharge_proof() {
        let mut session = MockSession::new();
        let mut found = make_state("s1", StepResult::Success, 0, "");
        found.message = "by (metis append_Nil)".to_string();
        session.add_discharge("default", found);

        let agent = MockAgent::with_default(vec![make_candidate("sledgehammer", 0.0)]);
        let outcome = SearchEngine::new(SearchConfig::default())
            .solve(&root(), &agent, &session, false)
            .await
            .unwrap();
        assert!(outcome.proved);
        assert_eq!(outcome.proof_steps, vec!["by (metis append_Nil)"]);
    }

    #[tokio::test]
    async fn test_plain_flavor_records_token() {
        let mut session = MockSession::new();
        let mut found = make_state("s1", StepResult::Success, 0, "");
        found.message = "by (metis append_Nil)".to_string();
        session.add_discharge("default", found);

        let agent = MockAgent::with_default(vec![make_candidate("sledgehammer", 0.0)]);
        let outcome = SearchEngine::new(SearchConfig::default())
            .with_flavor(Arc::new(PlainFlavor))
            .solve(&root(), &agent, &session, false)
            .await
            .unwrap();
        assert!(outcome.proved);
        assert_eq!(outcome.proof_steps, vec!["sledgehammer"]);
    }

    #[tokio::test]
    async fn test_transient_session_error_propagates() {
        let mut session = MockSession::new();
        session.fail_on("by auto");
        let agent = MockAgent::with_default(vec![make_candidate("by auto", 0.0)]);

        let err = SearchEngine::new(SearchConfig::default())
            .solve(&root(), &agent, &session, false)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, SearchError::Session(ItpError::Unavailable(_))));
    }

    #[test]
    fn test_agent_error_transience() {
        let unavailable = SearchError::Agent(AgentError::Unavailable("down".into()).into());
        assert!(unavailable.is_transient());
        let protocol = SearchError::Agent(AgentError::Protocol("bad".into()).into());
        assert!(!protocol.is_transient());
        let other = SearchError::Agent(anyhow::anyhow!("boom"));
        assert!(!other.is_transient());
        assert!(!SearchError::Invariant("x".into()).is_transient());
    }
}
