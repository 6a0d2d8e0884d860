//! Constraint Checker CLI
//!
//! Loads container schemas and constraint declarations, validates the resulting
//! constraint graph and answers direct-constraint queries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use referential_constraints::{
    load_from_directory, CheckConfig, ConstraintDeclarations, ConstraintIndex, ConstraintsBuilder,
    LoadReport, OutputFormat,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "constraint-check")]
#[command(about = "Validate and query referential constraints between document containers")]
struct Cli {
    /// Configuration file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema directory (overrides the configuration)
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    /// Constraint declaration file (overrides the configuration)
    #[arg(long, global = true)]
    declarations: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the constraint graph and report its shape
    Validate,

    /// Print the direct constraints of a container's documents as JSON
    Query {
        /// Container id
        #[arg(long)]
        container: String,

        /// Document type pattern, as a JSON object
        #[arg(long)]
        doc_type: Option<String>,

        /// Only constraints with this cascade delete flag
        #[arg(long)]
        cascade: Option<bool>,
    },

    /// Export the constraint graph in GraphViz DOT format
    ExportDot {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CheckConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.schemas {
        config.schemas.dir = dir;
    }
    if let Some(path) = cli.declarations {
        config.declarations.path = path;
    }

    let (index, report) = build_index(&config)?;

    match cli.command {
        Commands::Validate => {
            println!(
                "✅ Loaded {} schema files across {} containers (bundle {})",
                report.files.len(),
                report.containers.len(),
                report.bundle_hash
            );
            println!(
                "✅ Constraint graph valid: {} vertices, {} edges, {} paths",
                index.vertex_count(),
                index.edge_count(),
                index.path_count()
            );
            println!("   Fingerprint: {}", index.fingerprint()?);
        }

        Commands::Query {
            container,
            doc_type,
            cascade,
        } => {
            let pattern = match doc_type {
                Some(raw) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&raw).context("--doc-type must be valid JSON")?;
                    match value {
                        serde_json::Value::Object(map) => Some(map),
                        _ => anyhow::bail!("--doc-type must be a JSON object"),
                    }
                }
                None => None,
            };

            let constraints = index.get_direct_constraints(&container, pattern.as_ref(), cascade);
            let output = match config.output.format {
                OutputFormat::Pretty => serde_json::to_string_pretty(&constraints)?,
                OutputFormat::Compact => serde_json::to_string(&constraints)?,
            };
            println!("{}", output);
        }

        Commands::ExportDot { output } => {
            let dot = index.to_dot();
            match output {
                Some(path) => {
                    std::fs::write(&path, &dot)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✅ Exported DOT to: {:?}", path);
                }
                None => print!("{}", dot),
            }
        }
    }

    Ok(())
}

fn build_index(config: &CheckConfig) -> Result<(ConstraintIndex, LoadReport)> {
    let mut builder = ConstraintsBuilder::new();

    let report = load_from_directory(&mut builder, &config.schemas.dir, &config.load_config())
        .with_context(|| format!("Failed to load schemas from {}", config.schemas.dir.display()))?;

    let declarations = ConstraintDeclarations::from_path(&config.declarations.path).with_context(|| {
        format!(
            "Failed to read declarations from {}",
            config.declarations.path.display()
        )
    })?;
    declarations
        .apply(&mut builder)
        .context("Failed to declare constraints")?;

    let index = builder.build().context("Constraint graph is invalid")?;
    Ok((index, report))
}
