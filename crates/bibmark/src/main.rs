//! bibmark CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "bibmark")]
#[command(version)]
#[command(about = "Resolve citation markers in Markdown documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve citations in documents, processed in the order given
    Process {
        /// Input Markdown files, processed in order
        inputs: Vec<String>,

        /// Path to a CSL-JSON bibliography file
        #[arg(long)]
        bib_file: Option<String>,

        /// Directory of CSL-JSON bibliography files
        #[arg(long)]
        bib_dir: Option<String>,

        /// Placeholder token for a document's own new references
        #[arg(long)]
        bib_command: Option<String>,

        /// Placeholder token for the full cumulative bibliography
        #[arg(long)]
        full_bib_command: Option<String>,

        /// CSL style file (selects the style-driven backend)
        #[arg(long)]
        style: Option<String>,

        /// Style processor binary (defaults to pandoc)
        #[arg(long)]
        style_processor: Option<String>,

        /// YAML configuration file (flags override its values)
        #[arg(long)]
        config: Option<String>,

        /// Write outputs to DIR, keeping input file names
        #[arg(long)]
        output_dir: Option<String>,

        /// Suppress console output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            inputs,
            bib_file,
            bib_dir,
            bib_command,
            full_bib_command,
            style,
            style_processor,
            config,
            output_dir,
            quiet,
        } => commands::process::execute(commands::process::ProcessArgs {
            inputs,
            bib_file,
            bib_dir,
            bib_command,
            full_bib_command,
            style,
            style_processor,
            config,
            output_dir,
            quiet,
        }),
    }
}
