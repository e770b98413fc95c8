//! Per-theory evaluation: walk a theory file lemma by lemma, search each one
//! from the canonical state, then replay the file's own proof to move on.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use isa_client::{IsaClient, ProofState, TheoryCommand, DEFAULT_STATE_ID};
use search::{Agent, SearchEngine, SearchError, StateLifecycleManager};

use crate::results::{EvalRecord, TheoryReport};

/// Per-command timeout used when moving the canonical state through a theory.
pub const REPLAY_TIMEOUT_SECS: u64 = 60;

/// Name of the command that closes a theory.
pub const END_COMMAND: &str = "end";

/// State text of a session with every theory closed.
pub const TOPLEVEL_STATE: &str = "Mode: Toplevel";

/// Session operations the driver needs on top of the search's own.
#[async_trait]
pub trait TheorySession: StateLifecycleManager {
    /// Parse `theory` into commands, ignored commands removed.
    async fn load_theory_commands(&self, theory: &Path)
        -> Result<Vec<TheoryCommand>, SearchError>;

    /// Run `theory` from its start up to and including `command`.
    async fn proceed_to(
        &self,
        theory: &Path,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ProofState, SearchError>;
}

#[async_trait]
impl TheorySession for IsaClient {
    async fn load_theory_commands(
        &self,
        theory: &Path,
    ) -> Result<Vec<TheoryCommand>, SearchError> {
        Ok(self.get_theory_commands(theory, false, true).await?)
    }

    async fn proceed_to(
        &self,
        theory: &Path,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ProofState, SearchError> {
        Ok(self.proceed_until(theory, command, timeout_secs).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("{0}")]
    Invariant(String),
}

/// Split `items` into groups, starting a new group at every item for which
/// `starts_group` holds. Items before the first match form the first group.
pub fn chop_by_condition<T: Clone>(items: &[T], starts_group: impl Fn(&T) -> bool) -> Vec<Vec<T>> {
    let mut groups = Vec::new();
    let mut current: Vec<T> = Vec::new();
    for item in items {
        if starts_group(item) && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(item.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Evaluate every lemma of `thy_path`.
///
/// Assumes the session is already set up. Transient service errors end the
/// theory early with `aborted` set and the records gathered so far. Broken
/// session invariants are returned as errors.
pub async fn evaluate_theory<S, F>(
    thy_path: &Path,
    agent: &dyn Agent,
    session: &S,
    engine: &SearchEngine,
    is_lemma_start: F,
) -> Result<TheoryReport, DriverError>
where
    S: TheorySession,
    F: Fn(&str) -> bool,
{
    let start = Instant::now();
    let mut report = TheoryReport::new(thy_path.to_path_buf());
    let result = walk_theory(thy_path, agent, session, engine, is_lemma_start, &mut report).await;
    report.eval_time_secs = start.elapsed().as_secs_f64();

    match result {
        Ok(()) => Ok(report),
        Err(DriverError::Search(e)) if e.is_transient() => {
            tracing::warn!(
                theory = %thy_path.display(),
                finished = report.records.len(),
                error = %e,
                "Aborting theory"
            );
            report.aborted = Some(e.to_string());
            Ok(report)
        }
        Err(e) => Err(e),
    }
}

async fn walk_theory<S, F>(
    thy_path: &Path,
    agent: &dyn Agent,
    session: &S,
    engine: &SearchEngine,
    is_lemma_start: F,
    report: &mut TheoryReport,
) -> Result<(), DriverError>
where
    S: TheorySession,
    F: Fn(&str) -> bool,
{
    tracing::debug!(theory = %thy_path.display(), "Parsing theory commands");
    let mut commands = session.load_theory_commands(thy_path).await?;
    let end = match commands.pop() {
        Some(c) if c.name == END_COMMAND => c,
        Some(c) => {
            return Err(DriverError::Invariant(format!(
                "last command of {} should be '{END_COMMAND}' but got '{}'",
                thy_path.display(),
                c.text
            )))
        }
        None => {
            return Err(DriverError::Invariant(format!(
                "no commands parsed from {}",
                thy_path.display()
            )))
        }
    };

    let groups = chop_by_condition(&commands, |c| is_lemma_start(&c.name));
    let lemma_total = groups.len().saturating_sub(1);
    tracing::info!(
        theory = %thy_path.display(),
        commands = commands.len() + 1,
        lemmas = lemma_total,
        "Parsed theory"
    );

    for (idx, group) in groups.iter().skip(1).enumerate() {
        let Some((statement, rest)) = group.split_first() else {
            continue;
        };
        tracing::info!(
            lemma = %statement.text,
            line = statement.line,
            "Processing lemma {}/{lemma_total}",
            idx + 1
        );

        let root = if idx == 0 {
            session
                .proceed_to(thy_path, &statement.text, REPLAY_TIMEOUT_SECS)
                .await?
        } else {
            session
                .execute_one(DEFAULT_STATE_ID, &statement.text, REPLAY_TIMEOUT_SECS)
                .await?
        };

        let outcome = engine
            .solve_labeled(&root, agent, session, true, &statement.text)
            .await?;
        tracing::info!(
            solved = outcome.proved,
            secs = outcome.summary.total_time_ms as f64 / 1000.0,
            "Solver {}",
            if outcome.proved { "succeeded" } else { "failed" }
        );
        report.records.push(EvalRecord {
            lemma: statement.text.clone(),
            line: statement.line,
            solved: outcome.proved,
            proof_steps: outcome.proof_steps,
            summary: outcome.summary,
        });

        // Replay the theory's own proof; step results are not checked.
        for command in rest {
            tracing::debug!(command = %command.text, "Replaying");
            let state = session
                .execute_one(DEFAULT_STATE_ID, &command.text, REPLAY_TIMEOUT_SECS)
                .await?;
            if state.id != DEFAULT_STATE_ID {
                return Err(DriverError::Invariant(format!(
                    "replaying '{}' moved the canonical state to '{}'",
                    command.text, state.id
                )));
            }
        }
    }

    tracing::info!(theory = %thy_path.display(), "Finishing theory");
    let last = if groups.len() > 1 {
        session
            .execute_one(DEFAULT_STATE_ID, &end.text, REPLAY_TIMEOUT_SECS)
            .await?
    } else {
        session
            .proceed_to(thy_path, &end.text, REPLAY_TIMEOUT_SECS)
            .await?
    };
    if last.state_text != TOPLEVEL_STATE {
        return Err(DriverError::Invariant(format!(
            "expected '{TOPLEVEL_STATE}' after closing {} but got '{}'",
            thy_path.display(),
            last.state_text
        )));
    }
    Ok(())
}
