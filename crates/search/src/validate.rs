//! Running candidate commands against the session, with discharge substitution.
//!
//! The discharge token (`sledgehammer`) cannot go through the batched
//! `execute` path: it needs its own call with an extended timeout. Only the
//! first occurrence in a batch is routed that way; later occurrences are sent
//! like any other command.

use isa_client::ProofState;

use crate::engine::{SearchError, StateLifecycleManager};

/// Multiplier applied to the step timeout for a discharge search.
pub const DISCHARGE_TIMEOUT_FACTOR: u64 = 3;

/// Whether `command` is the discharge-search token (trimmed, case-insensitive).
pub fn is_discharge_command(command: &str) -> bool {
    command.trim().eq_ignore_ascii_case("sledgehammer")
}

/// Run every command against `state_id`, one child state per command.
///
/// The result is aligned with `commands`. An empty list issues no call.
pub async fn validate_batch(
    session: &dyn StateLifecycleManager,
    state_id: &str,
    commands: &[String],
    step_timeout_secs: u64,
) -> Result<Vec<ProofState>, SearchError> {
    if commands.is_empty() {
        return Ok(Vec::new());
    }

    let discharge_at = commands.iter().position(|c| is_discharge_command(c));
    let regular: Vec<String> = commands
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != discharge_at)
        .map(|(_, c)| c.clone())
        .collect();

    let mut states = if regular.is_empty() {
        Vec::new()
    } else {
        session
            .execute_batch(state_id, &regular, step_timeout_secs)
            .await?
    };
    if states.len() != regular.len() {
        return Err(SearchError::Invariant(format!(
            "session returned {} states for {} commands",
            states.len(),
            regular.len()
        )));
    }

    if let Some(pos) = discharge_at {
        let discharged = session
            .discharge_search(
                state_id,
                step_timeout_secs,
                step_timeout_secs.saturating_mul(DISCHARGE_TIMEOUT_FACTOR),
            )
            .await?;
        states.insert(pos, discharged);
    }
    Ok(states)
}

/// Run a single command against `state_id`, routing the discharge token.
pub async fn execute_step(
    session: &dyn StateLifecycleManager,
    state_id: &str,
    command: &str,
    step_timeout_secs: u64,
) -> Result<ProofState, SearchError> {
    if is_discharge_command(command) {
        session
            .discharge_search(
                state_id,
                step_timeout_secs,
                step_timeout_secs.saturating_mul(DISCHARGE_TIMEOUT_FACTOR),
            )
            .await
    } else {
        session.execute_one(state_id, command, step_timeout_secs).await
    }
}
