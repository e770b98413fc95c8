//! Async client for a remote Isabelle evaluation session.
//!
//! The session service keeps named proof states and runs Isabelle commands
//! against them. This crate speaks its JSON-over-HTTP protocol and decodes
//! every response into plain records.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use isa_client::{ClientConfig, IsaClient, IsaSetup, DEFAULT_STATE_ID};
//! use std::path::{Path, PathBuf};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IsaClient::connect(ClientConfig::default())?;
//! client
//!     .setup_itp(&IsaSetup {
//!         isa_path: PathBuf::from("/opt/Isabelle2023"),
//!         session: "HOL".to_string(),
//!         working_directory: PathBuf::from("/thys"),
//!         session_roots: None,
//!     })
//!     .await?;
//!
//! let state = client
//!     .proceed_until(Path::new("/thys/Test.thy"), "lemma test: \"p ==> p\"", 60)
//!     .await?;
//! let next = client.execute(DEFAULT_STATE_ID, "by simp", 10).await?;
//! println!("{} -> {}", state.id, next.result);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod protocol;
pub mod types;

pub use client::IsaClient;
pub use types::{
    is_proof_command, ClientConfig, IsaSetup, ItpError, ProofState, StepResult, TheoryCommand,
    DEFAULT_STATE_ID, ISA_PROOF_COMMANDS,
};
