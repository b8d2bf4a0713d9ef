use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gsnap_tools::{format_report_pretty, run_scenario, RunOptions, Scenario};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gsnap-tools",
    version,
    about = "gsnap scenario runner and schema tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode and decode a scenario, reporting bit sizes.
    Run {
        /// Schema JSON describing components and ghost types.
        #[arg(long)]
        schema: PathBuf,
        /// Scenario JSON with ghost states per tick.
        #[arg(long)]
        scenario: PathBuf,
        /// Packet capacity in bytes; unbounded if omitted.
        #[arg(long)]
        capacity: Option<usize>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the schema hash.
    Hash {
        /// Schema JSON.
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            schema,
            scenario,
            capacity,
            format,
        } => {
            let schema = load_schema(&schema).context("load schema")?;
            let contents = fs::read_to_string(&scenario)
                .with_context(|| format!("read scenario {}", scenario.display()))?;
            let scenario: Scenario =
                serde_json::from_str(&contents).context("parse scenario json")?;
            let options = RunOptions {
                packet_capacity: capacity,
                ..RunOptions::default()
            };
            let report = run_scenario(Arc::new(schema), &scenario, options)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => {
                    print!("{}", format_report_pretty(&report));
                }
            }
        }
        Command::Hash { schema } => {
            let schema = load_schema(&schema).context("load schema")?;
            println!("0x{:016x}", schema::schema_hash(&schema));
        }
    }
    Ok(())
}

fn load_schema(path: &Path) -> Result<schema::Schema> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read schema {}", path.display()))?;
    let schema: schema::Schema = serde_json::from_str(&contents).context("parse schema json")?;
    schema.validate().context("schema validation failed")?;
    Ok(schema)
}
