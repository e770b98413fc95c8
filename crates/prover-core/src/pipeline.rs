//! Evaluation pipeline behind the `isa-eval` subcommands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use agent::AgentClient;
use indicatif::{ProgressBar, ProgressStyle};
use isa_client::{is_proof_command, IsaClient, IsaSetup};
use search::{Agent, FixedAgent, SearchEngine};
use tracing::Instrument;

use crate::config::{load_eval_toml, EvalOverrides, EvalToml};
use crate::driver::evaluate_theory;
use crate::results::{EvalResults, EvalSummary, TheoryReport};

/// Arguments for the `eval` subcommand.
#[derive(Debug)]
pub struct EvalArgs {
    /// Path to the TOML config. Defaults apply when absent.
    pub config: Option<PathBuf>,
    /// Isabelle session to set up once for every theory.
    pub setup: IsaSetup,
    /// Theory files, evaluated in order.
    pub theories: Vec<PathBuf>,
    /// Where to write the JSON results.
    pub output: Option<PathBuf>,
    pub overrides: EvalOverrides,
    /// Propose these commands at every state instead of querying the agent server.
    pub fixed_commands: Vec<String>,
}

/// Arguments for the `summary` subcommand.
#[derive(Debug)]
pub struct SummaryArgs {
    /// Path to a results JSON written by `eval`.
    pub input: PathBuf,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

/// Resolve config: file (if any), then CLI overrides.
///
/// Degenerate settings are reported by [`SearchEngine::new`].
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &EvalOverrides,
) -> anyhow::Result<EvalToml> {
    let mut toml = match path {
        Some(p) => load_eval_toml(p)?,
        None => EvalToml::default(),
    };
    toml.apply_overrides(overrides);
    Ok(toml)
}

/// Set up the session, evaluate every theory, close the session, report.
pub async fn run_eval(args: EvalArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    // 1. Load config
    let toml = resolve_config(args.config.as_deref(), &args.overrides)?;

    // 2. Connect clients
    let session = IsaClient::connect(toml.session.clone())?;
    let (agent, agent_label): (Box<dyn Agent>, String) = if args.fixed_commands.is_empty() {
        tracing::info!(url = %toml.agent.server_url, "Using agent server");
        (
            Box::new(AgentClient::new(toml.agent.clone())?) as Box<dyn Agent>,
            toml.agent.server_url.clone(),
        )
    } else {
        tracing::info!(commands = ?args.fixed_commands, "Using fixed commands");
        (
            Box::new(FixedAgent::new(args.fixed_commands.clone())) as Box<dyn Agent>,
            format!("fixed: {}", args.fixed_commands.join(", ")),
        )
    };

    // 3. Set up the ITP once
    let setup_start = Instant::now();
    session.setup_itp(&args.setup).await?;
    tracing::info!(
        secs = setup_start.elapsed().as_secs_f64(),
        "ITP setup finished"
    );

    // 4. Evaluate, closing the session whatever happens
    let engine = SearchEngine::new(toml.search.clone());
    let evaluated = evaluate_all(&args.theories, agent.as_ref(), &session, &engine).await;
    if let Err(e) = session.close_itp().await {
        tracing::warn!(error = %e, "Failed to close ITP session");
    }
    let theories = evaluated?;

    let results = EvalResults {
        session: args.setup.session.clone(),
        agent: agent_label,
        search: toml.search,
        theories,
    };

    // 5. Print summary
    let summary = EvalSummary::from_results(&results);
    println!("\n--- Evaluation Summary ---");
    println!("{summary}");
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    // 6. Write results
    if let Some(output) = &args.output {
        write_results(&results, output)?;
        println!("Output: {}", output.display());
    }
    Ok(())
}

async fn evaluate_all(
    theories: &[PathBuf],
    agent: &dyn Agent,
    session: &IsaClient,
    engine: &SearchEngine,
) -> anyhow::Result<Vec<TheoryReport>> {
    let pb = ProgressBar::new(theories.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .expect("valid progress bar template")
            .progress_chars("=> "),
    );

    let mut reports = Vec::with_capacity(theories.len());
    for thy_path in theories {
        pb.set_message(thy_path.display().to_string());
        let span = tracing::info_span!("theory", path = %thy_path.display());
        let report = evaluate_theory(thy_path, agent, session, engine, is_proof_command)
            .instrument(span)
            .await?;
        tracing::info!(
            theory = %thy_path.display(),
            solved = report.solved_count(),
            lemmas = report.records.len(),
            secs = report.eval_time_secs,
            aborted = report.aborted.is_some(),
            "Theory finished"
        );
        reports.push(report);
        pb.inc(1);
    }
    pb.finish_with_message("done");
    Ok(reports)
}

/// Write results as pretty JSON.
pub fn write_results(results: &EvalResults, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Read results written by [`write_results`].
pub fn read_results(path: &Path) -> anyhow::Result<EvalResults> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Print the summary of a previously written results file.
pub fn run_summary(args: SummaryArgs) -> anyhow::Result<()> {
    let results = read_results(&args.input)?;
    let summary = EvalSummary::from_results(&results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("--- Evaluation Summary ---");
        println!("File: {}", args.input.display());
        println!("Session: {}", results.session);
        println!("Agent: {}", results.agent);
        println!("{summary}");
    }
    Ok(())
}
