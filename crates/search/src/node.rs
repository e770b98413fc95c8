use isa_client::ProofState;

/// A node in the search frontier.
///
/// Carries the full command path from the search root, so no parent
/// links are kept once a node is popped.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchNode {
    /// Priority. Lower is expanded first.
    pub score: f64,
    /// Commands applied from the root to reach `state`.
    pub proof_steps: Vec<String>,
    /// Snapshot of the remote state this node stands for.
    pub state: ProofState,
}

impl SearchNode {
    /// The search root: score 0 and an empty path.
    pub fn root(state: ProofState) -> Self {
        Self {
            score: 0.0,
            proof_steps: Vec::new(),
            state,
        }
    }

    /// Child reached from `self` by `step`, scored `self.score - logit`.
    ///
    /// An unset logit (`+inf`) gives the child the best possible score.
    pub fn child(&self, step: String, logit: f64, state: ProofState) -> Self {
        let mut proof_steps = Vec::with_capacity(self.proof_steps.len() + 1);
        proof_steps.extend_from_slice(&self.proof_steps);
        proof_steps.push(step);
        Self {
            score: self.score - logit,
            proof_steps,
            state,
        }
    }

    pub fn depth(&self) -> usize {
        self.proof_steps.len()
    }

    pub fn state_id(&self) -> &str {
        &self.state.id
    }
}
