use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use u_aps::config::ProblemConfig;
use u_aps::dispatching::PriorityRule;
use u_aps::models::Plan;
use u_aps::planner::Planner;
use u_aps::scheduler::PlanMetrics;
use u_aps::validation::validate_plan;

#[derive(Parser)]
#[command(
    name = "u-aps",
    version,
    about = "Priority-rule production scheduling for parallel machines",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate work orders and schedule them
    Schedule {
        /// Problem configuration (JSON); the reference scenario if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured priority rule (LPT, EDD, WSPT)
        #[arg(short, long)]
        rule: Option<PriorityRule>,

        /// Write the plan payload to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Re-ingest a plan and report its metrics
    Metrics {
        /// Plan file (`{"plan": [...]}` or a bare array)
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Print the reference configuration
    DefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Schedule { config, rule, out } => schedule(config, rule, out),
        Commands::Metrics { plan } => metrics(plan),
        Commands::DefaultConfig => {
            println!("{}", ProblemConfig::default().to_json_string()?);
            Ok(())
        }
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("u_aps=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("u_aps=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn schedule(config: Option<PathBuf>, rule: Option<PriorityRule>, out: Option<PathBuf>) -> Result<()> {
    let mut problem = match &config {
        Some(path) => ProblemConfig::from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ProblemConfig::default(),
    };
    if let Some(rule) = rule {
        problem.rule = rule;
    }

    let outcome = Planner::new().run(&problem)?;
    for issue in &outcome.downtime_issues {
        warn!("{issue}");
    }

    let payload = outcome.plan.to_json_string()?;
    match out {
        Some(path) => {
            std::fs::write(&path, payload)
                .with_context(|| format!("writing plan to {}", path.display()))?;
            info!(path = %path.display(), tasks = outcome.plan.len(), "plan written");
        }
        None => println!("{payload}"),
    }
    println!("{}", serde_json::to_string_pretty(&outcome.metrics)?);
    Ok(())
}

fn metrics(path: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    let plan = Plan::from_json_str(&raw)?;

    for violation in validate_plan(&plan, None) {
        warn!(task = violation.task_index, "{}", violation.message);
    }

    let metrics = PlanMetrics::calculate(&plan);
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
