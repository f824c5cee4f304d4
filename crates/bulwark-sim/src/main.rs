//! CLI entry point for the bulwark-sim risk engine.
//!
//! Writes JSON results to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use bulwark_audit::AuditQuery;
use bulwark_core::{Diagram, DiagramId};
use bulwark_sim::rules::{RULES, SENSITIVE_DATA};
use bulwark_sim::{AppConfig, SimulationEngine};
use bulwark_store::GraphClient;

#[derive(Parser)]
#[command(name = "bulwark-sim")]
#[command(about = "Attack-surface risk simulation for infrastructure diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: bulwark).
    #[arg(short, long, default_value = bulwark_core::config::DEFAULT_CONFIG_PREFIX, global = true)]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a stored diagram and commit its risk score.
    Simulate {
        /// Diagram ID.
        #[arg(long)]
        diagram_id: String,
    },
    /// Evaluate a diagram document read from stdin. Nothing is persisted.
    Evaluate,
    /// Print the rule catalogue.
    Rules,
    /// List a diagram's audit records, newest first, verifying each one.
    Audit {
        /// Diagram ID.
        #[arg(long)]
        diagram_id: String,
        /// Only show the newest N records.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let app_config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Simulate { ref diagram_id } => {
            let diagram_id = parse_diagram_id(diagram_id)?;
            let graph = GraphClient::connect(&app_config.neo4j).await?;
            let engine = SimulationEngine::new(graph).with_config(app_config.simulation);
            let result = engine.simulate(&diagram_id).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Evaluate => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let mut diagram: Diagram = serde_json::from_str(&input)?;
            diagram.fill_missing_edge_ids();
            let result = bulwark_sim::evaluate(&diagram, &app_config.simulation)?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Rules => {
            let catalogue = serde_json::json!({
                "rules": RULES,
                "sensitiveData": &SENSITIVE_DATA,
            });
            println!("{}", serde_json::to_string_pretty(&catalogue)?);
        }
        Command::Audit { ref diagram_id, limit } => {
            let diagram_id = parse_diagram_id(diagram_id)?;
            let audit_dir = app_config
                .simulation
                .audit_dir
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("simulation.audit_dir is not configured"))?;
            let query = AuditQuery {
                limit,
                ..Default::default()
            };
            let entries = bulwark_sim::audit::history(audit_dir, &diagram_id, &query)?;
            println!("{}", serde_json::to_string(&entries)?);

            let tampered = entries.iter().filter(|e| !e.intact).count();
            if tampered > 0 {
                anyhow::bail!("{tampered} audit record(s) failed integrity verification");
            }
        }
    }

    Ok(())
}

fn parse_diagram_id(raw: &str) -> anyhow::Result<DiagramId> {
    Ok(DiagramId(uuid::Uuid::parse_str(raw)?))
}
