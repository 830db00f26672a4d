//! CLI entry point for the rim-analysis engine.
//!
//! Designed for subprocess invocation from the RIM API:
//! reads a JSON `GraphInput` from stdin, writes a JSON result to stdout.
//! Logs go to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rim_analysis::{watchdog, AnalysisError, RiskAnalysisEngine};
use rim_core::types::GraphInput;
use rim_core::AnalysisConfig;

#[derive(Parser)]
#[command(name = "rim-analyze")]
#[command(about = "Exposure and influence analysis for the risk influence map")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: rim).
    #[arg(short, long, default_value = "rim", global = true)]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Abandon the analysis after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Full report: exposure, influence and coverage (reads JSON from stdin).
    Analyze,
    /// Exposure calculation only (reads JSON from stdin).
    Exposure,
    /// Influence network analysis only (reads JSON from stdin).
    Influence,
    /// What one mitigation contributes (reads JSON from stdin).
    MitigationImpact {
        /// Mitigation ID.
        #[arg(long)]
        mitigation: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let logger = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        logger.json().init();
    } else {
        logger.init();
    }

    let config = AnalysisConfig::load(&cli.config)?;
    let engine = RiskAnalysisEngine::new().with_config(config);

    let raw = std::io::read_to_string(std::io::stdin())?;
    let input: GraphInput = serde_json::from_str(&raw)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(run(engine, input, cli.command, cli.timeout_secs));
    // An expired analysis is still running on the blocking pool; don't wait for it.
    runtime.shutdown_background();

    println!("{}", output?);
    Ok(())
}

async fn run(
    engine: RiskAnalysisEngine,
    input: GraphInput,
    command: Command,
    timeout_secs: Option<u64>,
) -> Result<String, AnalysisError> {
    let job = move || -> Result<String, AnalysisError> {
        let json = match command {
            Command::Analyze => serde_json::to_string(&engine.analyze(&input)?)?,
            Command::Exposure => serde_json::to_string(&engine.compute_exposure(&input)?)?,
            Command::Influence => serde_json::to_string(&engine.analyze_influence(&input)?)?,
            Command::MitigationImpact { mitigation } => {
                serde_json::to_string(&engine.mitigation_impact(&input, &mitigation)?)?
            }
        };
        Ok(json)
    };

    watchdog::run_with_timeout(job, timeout_secs).await
}
