//! Budgeted best-first proof search over a remote ITP session.
//!
//! The search asks an [`Agent`] for candidate commands, validates them in
//! batches against a [`StateLifecycleManager`], and keeps the most promising
//! states in a bounded [`Frontier`]. Both collaborators are traits so the
//! algorithm can be tested with mocks (no ITP, no agent server).
//!
//! # Key types
//!
//! - [`SearchEngine`] — the search driver
//! - [`SearchConfig`] — configuration loaded from TOML
//! - [`SearchNode`] / [`Frontier`] — frontier entries and the bounded queue
//! - [`SearchSummary`] / [`FailureReason`] — per-search telemetry
//! - [`SearchFlavor`] — prompt and proof-step hooks ([`IsabelleFlavor`], [`PlainFlavor`])

pub mod adapters;
pub mod config;
pub mod engine;
pub mod filter;
pub mod frontier;
pub mod mocks;
pub mod node;
pub mod summary;
pub mod validate;

pub use adapters::FixedAgent;
pub use config::SearchConfig;
pub use engine::{
    Agent, IsabelleFlavor, PlainFlavor, SearchEngine, SearchError, SearchFlavor, SearchOutcome,
    StateLifecycleManager,
};
pub use filter::{filter_agent_outputs, sort_by_confidence};
pub use frontier::Frontier;
pub use node::SearchNode;
pub use summary::{FailureReason, SearchSummary};
pub use validate::{execute_step, is_discharge_command, validate_batch};
