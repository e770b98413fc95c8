//! Result types for an evaluation run and its aggregate summary.

use std::fmt;
use std::path::PathBuf;

use search::{SearchConfig, SearchSummary};
use serde::{Deserialize, Serialize};

/// Outcome of the search on one lemma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Source text of the lemma statement command.
    pub lemma: String,
    /// Line of the statement in its theory file.
    #[serde(default)]
    pub line: u32,
    pub solved: bool,
    /// Replayable proof commands; empty unless solved.
    pub proof_steps: Vec<String>,
    pub summary: SearchSummary,
}

/// All records for one theory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoryReport {
    pub theory: PathBuf,
    pub records: Vec<EvalRecord>,
    /// Wall-clock time spent on the file in seconds, replay included.
    pub eval_time_secs: f64,
    /// Set when a transient service error cut the file short.
    /// `records` then holds only the lemmas finished before it.
    #[serde(default)]
    pub aborted: Option<String>,
}

impl TheoryReport {
    pub fn new(theory: PathBuf) -> Self {
        Self {
            theory,
            records: Vec::new(),
            eval_time_secs: 0.0,
            aborted: None,
        }
    }

    pub fn solved_count(&self) -> usize {
        self.records.iter().filter(|r| r.solved).count()
    }
}

/// Everything written by `isa-eval eval --output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResults {
    /// Isabelle session the theories were evaluated in.
    pub session: String,
    /// Agent endpoint, or the fixed command list for baseline runs.
    pub agent: String,
    pub search: SearchConfig,
    pub theories: Vec<TheoryReport>,
}

/// Aggregate statistics over an [`EvalResults`].
///
/// Averages are `0.0` when their denominator is zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalSummary {
    pub theory_count: usize,
    pub aborted_theories: usize,
    pub lemma_count: usize,
    pub solved_count: usize,
    pub generated_count: u64,
    pub succeeded_count: u64,
    pub query_count: u64,
    pub timeout_count: u64,
    /// Per theory file.
    pub avg_eval_time_secs: f64,
    /// Per lemma.
    pub avg_search_time_secs: f64,
    pub avg_agent_time_secs: f64,
    pub avg_itp_time_secs: f64,
    pub median_search_time_secs: f64,
    /// Over solved lemmas.
    pub avg_proof_length: f64,
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

impl EvalSummary {
    pub fn from_results(results: &EvalResults) -> Self {
        let records: Vec<&EvalRecord> = results
            .theories
            .iter()
            .flat_map(|t| t.records.iter())
            .collect();
        let lemma_count = records.len();
        let solved: Vec<&&EvalRecord> = records.iter().filter(|r| r.solved).collect();

        let total_eval: f64 = results.theories.iter().map(|t| t.eval_time_secs).sum();
        let mut search_times: Vec<f64> = records
            .iter()
            .map(|r| secs(r.summary.total_time_ms))
            .collect();
        let total_search: f64 = search_times.iter().sum();
        let total_agent: f64 = records.iter().map(|r| secs(r.summary.agent_time_ms)).sum();
        let total_itp: f64 = records.iter().map(|r| secs(r.summary.itp_time_ms)).sum();
        let total_steps: usize = solved.iter().map(|r| r.proof_steps.len()).sum();

        Self {
            theory_count: results.theories.len(),
            aborted_theories: results
                .theories
                .iter()
                .filter(|t| t.aborted.is_some())
                .count(),
            lemma_count,
            solved_count: solved.len(),
            generated_count: records.iter().map(|r| r.summary.generated_count as u64).sum(),
            succeeded_count: records.iter().map(|r| r.summary.succeeded_count as u64).sum(),
            query_count: records.iter().map(|r| r.summary.query_count as u64).sum(),
            timeout_count: records.iter().map(|r| r.summary.timeout_count as u64).sum(),
            avg_eval_time_secs: mean(total_eval, results.theories.len()),
            avg_search_time_secs: mean(total_search, lemma_count),
            avg_agent_time_secs: mean(total_agent, lemma_count),
            avg_itp_time_secs: mean(total_itp, lemma_count),
            median_search_time_secs: median(&mut search_times),
            avg_proof_length: mean(total_steps as f64, solved.len()),
        }
    }
}

impl fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Solved {} out of {} lemmas",
            self.solved_count, self.lemma_count
        )?;
        writeln!(
            f,
            "Generated {} commands, succeeded {}",
            self.generated_count, self.succeeded_count
        )?;
        writeln!(
            f,
            "Total query count: {}, timeout count: {}",
            self.query_count, self.timeout_count
        )?;
        writeln!(
            f,
            "Average evaluation time (each file): {:.4} seconds",
            self.avg_eval_time_secs
        )?;
        writeln!(
            f,
            "Average generated proof length: {:.4}",
            self.avg_proof_length
        )?;
        write!(
            f,
            "Average search time: {:.4} seconds (query {:.4} / ITP {:.4}), median {:.4}",
            self.avg_search_time_secs,
            self.avg_agent_time_secs,
            self.avg_itp_time_secs,
            self.median_search_time_secs
        )?;
        if self.aborted_theories > 0 {
            write!(
                f,
                "\nAborted theories: {} of {}",
                self.aborted_theories, self.theory_count
            )?;
        }
        Ok(())
    }
}

/// Compute the median of a slice of f64 values.
///
/// Returns 0.0 for empty slices.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
