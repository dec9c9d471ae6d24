/*!
animint Command Line Interface

Exports visualizations described by a JSON configuration into chunk files and a
`plot.json` manifest.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animint::config::ExportConfig;
use animint::{DirectoryWriter, ExportReport, Exporter, MemoryWriter, Visualization, VERSION};

#[derive(Parser)]
#[command(name = "animint")]
#[command(about = "Compile interactive plot layers into selector-indexed chunk files")]
#[command(version = VERSION)]
pub struct Cli {
    /// Log planning decisions
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export every layer and write the manifest
    Export {
        /// Path to the export configuration (JSON)
        config: PathBuf,

        /// Output directory
        #[arg(long, default_value = "animint-out")]
        out: PathBuf,

        /// Compile layers in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show chunk and nest decisions without writing anything
    Plan {
        /// Path to the export configuration (JSON)
        config: PathBuf,
    },

    /// Check layer aesthetics and selector declarations
    Validate {
        /// Path to the export configuration (JSON)
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "animint=debug" } else { "animint=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Export {
            config,
            out,
            parallel,
        } => {
            let (mut options, visualization) = load(&config)?;
            options.parallel |= parallel;

            let writer = DirectoryWriter::new(&out)?;
            let report = Exporter::new(options, &writer).export(&visualization)?;
            print_report(&report);
            println!(
                "Wrote {} layers to {}",
                report.manifest.geoms.len(),
                out.display()
            );
            if !report.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Plan { config } => {
            let (options, visualization) = load(&config)?;
            let writer = MemoryWriter::new();
            let report = Exporter::new(options, &writer).export(&visualization)?;

            for (classed, layer) in &report.manifest.geoms {
                println!("{}", classed);
                println!("  chunk_order: [{}]", layer.chunk_order.join(", "));
                println!("  nest_order:  [{}]", layer.nest_order.join(", "));
                println!("  chunks:      {}", layer.total);
                if let Some(common) = &layer.common {
                    println!("  common:      {} ({})", common, layer.columns.common.join(", "));
                }
            }
            print_report(&report);
        }

        Commands::Validate { config } => {
            let (options, visualization) = load(&config)?;
            let writer = MemoryWriter::new();
            let failures = Exporter::new(options, &writer).validate(&visualization)?;

            if failures.is_empty() {
                println!("Configuration is valid");
            } else {
                for failure in &failures {
                    eprintln!("Error: {}", failure.error);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<(animint::ExportOptions, Visualization)> {
    let config = ExportConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let options = config.options.clone();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let visualization = config.into_visualization(base_dir)?;
    Ok((options, visualization))
}

fn print_report(report: &ExportReport) {
    for warning in &report.warnings {
        eprintln!("Warning [{}]: {}", warning.layer, warning.message);
    }
    for failure in &report.failures {
        eprintln!("Error: {}", failure.error);
    }
}
