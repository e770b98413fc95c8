use std::path::PathBuf;

use clap::{Parser, Subcommand};
use isa_client::IsaSetup;
use tracing_subscriber::EnvFilter;

use prover_core::config::EvalOverrides;
use prover_core::pipeline::{self, EvalArgs, SummaryArgs};

/// isa-eval: evaluate a proof agent with best-first search over Isabelle theories.
#[derive(Parser)]
#[command(name = "isa-eval", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a proof of every lemma in the given theory files.
    Eval {
        /// Path to search config TOML file (e.g. configs/search.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Isabelle installation directory.
        #[arg(long)]
        isa_path: PathBuf,
        /// Isabelle session to build and load (e.g. HOL).
        #[arg(long, default_value = "HOL")]
        session: String,
        /// Directory theory files are resolved against.
        #[arg(long)]
        working_dir: PathBuf,
        /// Extra directory searched for session ROOT files.
        #[arg(long)]
        session_roots: Option<PathBuf>,
        /// Theory files to evaluate, in order.
        #[arg(long, required = true, num_args = 1..)]
        theories: Vec<PathBuf>,
        /// Path to write JSON evaluation results.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the session service URL (e.g., http://localhost:8980).
        #[arg(long)]
        server_url: Option<String>,
        /// Override the agent server URL (e.g., http://localhost:30000).
        #[arg(long)]
        agent_url: Option<String>,
        /// Override the number of agent queries per lemma.
        #[arg(long)]
        query_limit: Option<u32>,
        /// Override the number of candidates requested per query.
        #[arg(long)]
        gen_length: Option<usize>,
        /// Override the per-command timeout in seconds.
        #[arg(long)]
        step_timeout: Option<u64>,
        /// Propose this command at every state instead of querying an agent
        /// server. Repeatable (e.g. --fixed-command sledgehammer).
        #[arg(long)]
        fixed_command: Vec<String>,
    },
    /// Print the summary of a results file written by `eval`.
    Summary {
        /// Path to the results JSON file.
        #[arg(long)]
        input: PathBuf,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Eval {
            config,
            isa_path,
            session,
            working_dir,
            session_roots,
            theories,
            output,
            server_url,
            agent_url,
            query_limit,
            gen_length,
            step_timeout,
            fixed_command,
        } => {
            pipeline::run_eval(EvalArgs {
                config,
                setup: IsaSetup {
                    isa_path,
                    session,
                    working_directory: working_dir,
                    session_roots,
                },
                theories,
                output,
                overrides: EvalOverrides {
                    server_url,
                    agent_url,
                    query_limit,
                    gen_length,
                    step_timeout_secs: step_timeout,
                },
                fixed_commands: fixed_command,
            })
            .await
        }
        Command::Summary { input, json } => pipeline::run_summary(SummaryArgs { input, json }),
    }
}
