//! HTTP client for a candidate-generation server.
//!
//! The server exposes two endpoints:
//!
//! - `POST /query` with `{"prompt": ..., "n": ...}` returning
//!   `{"candidates": [{"command": ..., "logit": ...}, ...]}`
//! - `POST /query_batch` with `{"prompts": [...], "n": ...}` returning
//!   `{"candidates": [[...], ...]}`, one list per prompt.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{AgentConfig, AgentError, CandidateOutput};

#[derive(Serialize)]
struct QueryRequest<'a> {
    prompt: &'a str,
    n: usize,
}

#[derive(Serialize)]
struct BatchQueryRequest<'a> {
    prompts: &'a [String],
    n: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    candidates: Vec<CandidateOutput>,
}

#[derive(Deserialize)]
struct BatchQueryResponse {
    candidates: Vec<Vec<CandidateOutput>>,
}

/// Cloneable HTTP client for the agent server.
#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    base_url: Url,
    config: AgentConfig,
}

impl AgentClient {
    /// Build a client. Does not contact the server.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let mut base_url = Url::parse(&config.server_url)
            .map_err(|e| AgentError::InvalidUrl(format!("'{}': {e}", config.server_url)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Unavailable(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Ask for up to `n` candidates for one prompt.
    pub async fn query(&self, prompt: &str, n: usize) -> Result<Vec<CandidateOutput>, AgentError> {
        let body = self
            .post("query", &QueryRequest { prompt, n })
            .await?;
        let resp: QueryResponse = parse_body(&body)?;
        tracing::debug!(candidates = resp.candidates.len(), "Agent query complete");
        Ok(resp.candidates)
    }

    /// Ask for up to `n` candidates for each prompt in one request.
    pub async fn query_batch(
        &self,
        prompts: &[String],
        n: usize,
    ) -> Result<Vec<Vec<CandidateOutput>>, AgentError> {
        if prompts.is_empty() {
            return Ok(vec![]);
        }
        let body = self
            .post("query_batch", &BatchQueryRequest { prompts, n })
            .await?;
        let resp: BatchQueryResponse = parse_body(&body)?;
        if resp.candidates.len() != prompts.len() {
            return Err(AgentError::Protocol(format!(
                "query_batch returned {} lists for {} prompts",
                resp.candidates.len(),
                prompts.len()
            )));
        }
        Ok(resp.candidates)
    }

    async fn post<T: Serialize>(&self, path: &str, request: &T) -> Result<Vec<u8>, AgentError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| AgentError::InvalidUrl(e.to_string()))?;
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| AgentError::Unavailable(format!("/{path}: {e}")))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AgentError::Unavailable(format!("/{path}: {e}")))?;
        if status.is_server_error() {
            return Err(AgentError::Unavailable(format!("/{path} returned {status}")));
        }
        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(AgentError::Protocol(format!(
                "/{path} returned {status}: {preview}"
            )));
        }
        Ok(bytes.to_vec())
    }
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, AgentError> {
    serde_json::from_slice(body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(body).chars().take(200).collect();
        AgentError::Protocol(format!("Failed to decode agent response: {e}. Raw: {preview}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_shape() {
        let json = serde_json::to_value(QueryRequest {
            prompt: "goal (1 subgoal)",
            n: 16,
        })
        .unwrap();
        assert_eq!(json["prompt"], "goal (1 subgoal)");
        assert_eq!(json["n"], 16);
    }

    #[test]
    fn test_parse_query_response_mixed_logits() {
        let body = br#"{"candidates": [
            {"command": "by auto", "logit": -0.5},
            {"command": "sledgehammer"},
            {"command": "by simp", "logit": null}
        ]}"#;
        let resp: QueryResponse = parse_body(body).unwrap();
        assert_eq!(resp.candidates.len(), 3);
        assert!((resp.candidates[0].logit - (-0.5)).abs() < 1e-12);
        assert_eq!(resp.candidates[1].logit, f64::INFINITY);
        assert_eq!(resp.candidates[2].logit, f64::INFINITY);
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let err = parse_body::<QueryResponse>(br#"{"outputs": []}"#).err().unwrap();
        assert!(err.to_string().contains("Failed to decode agent response"));
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let err = AgentClient::new(AgentConfig {
            server_url: "::nope".into(),
            timeout_secs: 1,
        })
        .err()
        .unwrap();
        assert!(matches!(err, AgentError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_batch_query_empty_input() {
        let client = AgentClient::new(AgentConfig::default()).unwrap();
        let result = client.query_batch(&[], 8).await.unwrap();
        assert!(result.is_empty());
    }
}
