//! Evaluation harness for the `isa-eval` binary.
//!
//! Walks Isabelle theory files lemma by lemma, runs the best-first search on
//! each statement, and aggregates the outcomes.

pub mod config;
pub mod driver;
pub mod pipeline;
pub mod results;

pub use driver::{evaluate_theory, DriverError, TheorySession};
pub use results::{EvalRecord, EvalResults, EvalSummary, TheoryReport};
