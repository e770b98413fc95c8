//! HTTP client for the Isabelle evaluation service.
//!
//! The service owns every proof state. This client only names them: each
//! call carries the id of the state to act on and returns a snapshot of the
//! state it produced.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use url::Url;

use crate::protocol::{
    decode_state, decode_states, decode_theory_commands, endpoint, ClearAndRenameRequest,
    EmptyRequest, ParseRequest, ProofCommands, ProofCommandsBatch, SetupRequest,
    SledgehammerRequest, StateRequest, TheoryContent,
};
use crate::types::{ClientConfig, IsaSetup, ItpError, ProofState, TheoryCommand};

/// Cloneable HTTP client for one session service.
///
/// No call is retried. Transport failures surface as
/// [`ItpError::Unavailable`] and the caller decides what to abandon.
#[derive(Clone)]
pub struct IsaClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl IsaClient {
    /// Build a client for `config.server_url`. Does not contact the service.
    pub fn connect(config: ClientConfig) -> Result<Self, ItpError> {
        let mut base_url = Url::parse(&config.server_url)
            .map_err(|e| ItpError::InvalidUrl(format!("'{}': {e}", config.server_url)))?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ItpError::Unavailable(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build and load the Isabelle session described by `setup`.
    pub async fn setup_itp(&self, setup: &IsaSetup) -> Result<(), ItpError> {
        tracing::info!(
            session = %setup.session,
            isa_path = %setup.isa_path.display(),
            "Setting up ITP session"
        );
        self.post(
            endpoint::SETUP,
            &SetupRequest::from(setup),
            self.config.setup_timeout_secs,
        )
        .await?;
        Ok(())
    }

    /// Tear down the current session.
    pub async fn close_itp(&self) -> Result<(), ItpError> {
        self.post(endpoint::CLOSE, &EmptyRequest {}, self.config.grace_secs)
            .await?;
        tracing::info!("ITP session closed");
        Ok(())
    }

    /// Load `theory` and run it up to (and including) the command `content`.
    ///
    /// The resulting state is stored under the default state id.
    pub async fn proceed_until(
        &self,
        theory: &Path,
        content: &str,
        timeout: u64,
    ) -> Result<ProofState, ItpError> {
        let request = TheoryContent {
            theory: theory.display().to_string(),
            content: content.to_string(),
            timeout,
        };
        let body = self
            .post(endpoint::PROCEED_UNTIL, &request, self.http_timeout(timeout))
            .await?;
        decode_state(&body)
    }

    /// Run one command against state `id`. No discharge substitution.
    pub async fn execute(
        &self,
        id: &str,
        commands: &str,
        timeout: u64,
    ) -> Result<ProofState, ItpError> {
        let request = ProofCommands {
            id: id.to_string(),
            commands: commands.to_string(),
            timeout,
        };
        let body = self
            .post(endpoint::EXECUTE, &request, self.http_timeout(timeout))
            .await?;
        decode_state(&body)
    }

    /// Run every command against state `id` in one round trip.
    ///
    /// Returns one state per command, in input order.
    pub async fn execute_many(
        &self,
        id: &str,
        commands: &[String],
        timeout: u64,
    ) -> Result<Vec<ProofState>, ItpError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let request = ProofCommandsBatch {
            requests: commands
                .iter()
                .map(|c| ProofCommands {
                    id: id.to_string(),
                    commands: c.clone(),
                    timeout,
                })
                .collect(),
        };
        let total_timeout = timeout.saturating_mul(commands.len() as u64);
        let body = self
            .post(
                endpoint::EXECUTE_MANY,
                &request,
                self.http_timeout(total_timeout),
            )
            .await?;
        decode_states(&body, commands.len())
    }

    /// Run a discharge search on state `id`.
    pub async fn call_sledgehammer(
        &self,
        id: &str,
        timeout: u64,
        sledgehammer_timeout: u64,
    ) -> Result<ProofState, ItpError> {
        let request = SledgehammerRequest {
            id: id.to_string(),
            timeout,
            sledgehammer_timeout,
        };
        let body = self
            .post(
                endpoint::SLEDGEHAMMER,
                &request,
                self.http_timeout(timeout.max(sledgehammer_timeout)),
            )
            .await?;
        decode_state(&body)
    }

    /// Copy state `id` under a fresh name.
    pub async fn clone_state(&self, id: &str) -> Result<ProofState, ItpError> {
        let body = self
            .post(
                endpoint::CLONE,
                &StateRequest { id: id.to_string() },
                self.config.grace_secs,
            )
            .await?;
        decode_state(&body)
    }

    /// Release state `id`.
    pub async fn remove_state(&self, id: &str) -> Result<(), ItpError> {
        self.post(
            endpoint::REMOVE,
            &StateRequest { id: id.to_string() },
            self.config.grace_secs,
        )
        .await?;
        Ok(())
    }

    /// Move state `id` onto `new_id`, overwriting whatever was there.
    pub async fn clear_and_rename_state(
        &self,
        id: &str,
        new_id: &str,
    ) -> Result<ProofState, ItpError> {
        let request = ClearAndRenameRequest {
            id: id.to_string(),
            new_id: new_id.to_string(),
        };
        let body = self
            .post(endpoint::CLEAR_AND_RENAME, &request, self.config.grace_secs)
            .await?;
        decode_state(&body)
    }

    /// Parse `theory` into its linear command stream.
    pub async fn get_theory_commands(
        &self,
        theory: &Path,
        only_statements: bool,
        remove_ignored: bool,
    ) -> Result<Vec<TheoryCommand>, ItpError> {
        let request = ParseRequest {
            theory: theory.display().to_string(),
            only_statements,
            remove_ignored,
        };
        let body = self
            .post(
                endpoint::THEORY_COMMANDS,
                &request,
                self.config.setup_timeout_secs,
            )
            .await?;
        decode_theory_commands(&body)
    }

    fn http_timeout(&self, itp_timeout: u64) -> u64 {
        itp_timeout.saturating_add(self.config.grace_secs)
    }

    fn url(&self, path: &str) -> Result<Url, ItpError> {
        self.base_url
            .join(path)
            .map_err(|e| ItpError::InvalidUrl(format!("{}{path}: {e}", self.base_url)))
    }

    /// POST a JSON body and return the raw response bytes on 2xx.
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        timeout_secs: u64,
    ) -> Result<Vec<u8>, ItpError> {
        let url = self.url(path)?;
        let resp = self
            .client
            .post(url)
            .timeout(Duration::from_secs(timeout_secs))
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport_error(path, e))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| classify_transport_error(path, e))?;

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ItpError::Unavailable(format!("/{path} returned 503")));
        }
        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&bytes).chars().take(500).collect();
            tracing::warn!(endpoint = path, status = status.as_u16(), "ITP request failed");
            return Err(ItpError::Service {
                status: status.as_u16(),
                body: preview,
            });
        }
        Ok(bytes.to_vec())
    }
}

fn classify_transport_error(path: &str, e: reqwest::Error) -> ItpError {
    if e.is_timeout() {
        ItpError::Unavailable(format!("/{path} timed out: {e}"))
    } else if e.is_connect() {
        ItpError::Unavailable(format!("cannot connect for /{path}: {e}"))
    } else {
        ItpError::Unavailable(format!("/{path} failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_bad_url() {
        let config = ClientConfig {
            server_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        let err = IsaClient::connect(config).err().unwrap();
        assert!(matches!(err, ItpError::InvalidUrl(_)));
    }

    #[test]
    fn connect_normalizes_trailing_slash() {
        let config = ClientConfig {
            server_url: "http://localhost:8980/isa".to_string(),
            ..ClientConfig::default()
        };
        let client = IsaClient::connect(config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8980/isa/");
        assert_eq!(
            client.url(endpoint::EXECUTE).unwrap().as_str(),
            "http://localhost:8980/isa/execute"
        );
    }

    #[test]
    fn http_timeout_adds_grace() {
        let client = IsaClient::connect(ClientConfig::default()).unwrap();
        assert_eq!(client.http_timeout(10), 40);
        assert_eq!(client.http_timeout(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn execute_many_empty_skips_round_trip() {
        // Nothing listens on this port; an empty batch must not connect.
        let config = ClientConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        };
        let client = IsaClient::connect(config).unwrap();
        let states = client.execute_many("default", &[], 10).await.unwrap();
        assert!(states.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_transient() {
        let config = ClientConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            ..ClientConfig::default()
        };
        let client = IsaClient::connect(config).unwrap();
        let err = client.remove_state("s1").await.unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err:?}");
    }
}
