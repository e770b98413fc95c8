/// Search configuration loaded from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchConfig {
    /// Number of candidate commands requested from the agent per query.
    #[serde(default = "default_gen_length")]
    pub gen_length: usize,

    /// Maximum number of agent queries before giving up.
    #[serde(default = "default_query_limit")]
    pub query_limit: u32,

    /// Frontier capacity. The worst-scoring node is evicted on overflow.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// ITP timeout per command, in seconds.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Wall-clock budget per search, in seconds. Checked between iterations.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,

    /// Maximum number of TIMEOUT outcomes before giving up.
    #[serde(default = "default_step_timeout_limit")]
    pub step_timeout_limit: u32,

    /// Release states of skipped, evicted and post-proof candidates with `remove`.
    ///
    /// Off by default: those states are left to the end-of-search rename.
    #[serde(default)]
    pub release_abandoned_states: bool,
}

fn default_gen_length() -> usize {
    16
}
fn default_query_limit() -> u32 {
    300
}
fn default_queue_length() -> usize {
    32
}
fn default_step_timeout() -> u64 {
    10
}
fn default_total_timeout() -> u64 {
    600
}
fn default_step_timeout_limit() -> u32 {
    60
}

impl SearchConfig {
    /// Log warnings for settings that make the search degenerate.
    pub fn validate(&self) {
        if self.queue_length == 0 {
            tracing::warn!("queue_length = 0; every child is dropped and searches end after the root query");
        }
        if self.gen_length == 0 {
            tracing::warn!("gen_length = 0; every expansion will produce no candidates");
        }
        if self.query_limit == 0 {
            tracing::warn!("query_limit = 0; searches will stop before the first query");
        }
        if self.step_timeout_limit == 0 {
            tracing::warn!("step_timeout_limit = 0; searches will stop before the first query");
        }
        if self.step_timeout_secs > self.total_timeout_secs {
            tracing::warn!(
                step = self.step_timeout_secs,
                total = self.total_timeout_secs,
                "step_timeout_secs exceeds total_timeout_secs"
            );
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            gen_length: default_gen_length(),
            query_limit: default_query_limit(),
            queue_length: default_queue_length(),
            step_timeout_secs: default_step_timeout(),
            total_timeout_secs: default_total_timeout(),
            step_timeout_limit: default_step_timeout_limit(),
            release_abandoned_states: false,
        }
    }
}
