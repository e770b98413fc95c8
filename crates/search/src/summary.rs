//! Telemetry accumulated by a single search.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a search ended without a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    #[serde(rename = "empty queue")]
    EmptyQueue,
    #[serde(rename = "query limit reached")]
    QueryLimit,
    #[serde(rename = "step timeout limit reached")]
    StepTimeoutLimit,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "unknown reason")]
    Unknown,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyQueue => "empty queue",
            Self::QueryLimit => "query limit reached",
            Self::StepTimeoutLimit => "step timeout limit reached",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown reason",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and timings for one call to `solve`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    /// Candidates whose command the ITP accepted.
    pub succeeded_count: u32,
    /// Candidates turned into child states.
    pub generated_count: u32,
    pub query_count: u32,
    pub timeout_count: u32,
    pub itp_time_ms: u64,
    pub agent_time_ms: u64,
    pub total_time_ms: u64,
    /// Frontier nodes skipped because their prompt was already queried.
    #[serde(default)]
    pub duplicates_skipped: u32,
    /// Frontier nodes evicted on overflow.
    #[serde(default)]
    pub nodes_dropped: u32,
    #[serde(default)]
    pub peak_frontier_size: usize,
    #[serde(default)]
    pub failure_reason: Option<FailureReason>,
}

fn secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

impl fmt::Display for SearchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total time {:.2} seconds (itp {:.2}, agent {:.2}); query {}, timeout {}; commands {} / {}",
            secs(self.total_time_ms),
            secs(self.itp_time_ms),
            secs(self.agent_time_ms),
            self.query_count,
            self.timeout_count,
            self.succeeded_count,
            self.generated_count,
        )?;
        if let Some(reason) = self.failure_reason {
            write!(f, "; failed due to {reason}")?;
        }
        Ok(())
    }
}
