//! TOML config loading for the `isa-eval` CLI.
//!
//! Deserializes `configs/search.toml`, which has `[search]`, `[session]` and
//! `[agent]` sections, then merges CLI overrides on top.

use std::path::Path;

use agent::AgentConfig;
use isa_client::ClientConfig;
use search::SearchConfig;
use serde::Deserialize;

/// Top-level structure matching `configs/search.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvalToml {
    /// Search algorithm parameters.
    #[serde(default)]
    pub search: SearchConfig,
    /// ITP session service connection.
    #[serde(default)]
    pub session: ClientConfig,
    /// Agent server connection.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// CLI flags that take priority over TOML values.
#[derive(Debug, Clone, Default)]
pub struct EvalOverrides {
    pub server_url: Option<String>,
    pub agent_url: Option<String>,
    pub query_limit: Option<u32>,
    pub gen_length: Option<usize>,
    pub step_timeout_secs: Option<u64>,
}

/// Load and deserialize an `EvalToml` from a TOML file.
pub fn load_eval_toml(path: &Path) -> anyhow::Result<EvalToml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
    let config: EvalToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded eval config");
    Ok(config)
}

impl EvalToml {
    /// Apply CLI overrides. Priority: defaults < TOML < CLI.
    pub fn apply_overrides(&mut self, overrides: &EvalOverrides) {
        if let Some(url) = &overrides.server_url {
            self.session.server_url = url.clone();
        }
        if let Some(url) = &overrides.agent_url {
            self.agent.server_url = url.clone();
        }
        if let Some(n) = overrides.query_limit {
            self.search.query_limit = n;
        }
        if let Some(n) = overrides.gen_length {
            self.search.gen_length = n;
        }
        if let Some(s) = overrides.step_timeout_secs {
            self.search.step_timeout_secs = s;
        }
    }
}
