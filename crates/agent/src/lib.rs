//! Candidate-command generation for proof search.
//!
//! # Key types
//!
//! - [`CandidateOutput`] — a proposed command with an unnormalized confidence
//! - [`AgentClient`] — HTTP client for a generation server

pub mod client;
pub mod types;

pub use client::AgentClient;
pub use types::{AgentConfig, AgentError, CandidateOutput};
