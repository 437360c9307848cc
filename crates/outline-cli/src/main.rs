//! Outline CLI - Command-line interface for Outline
//!
//! Loads a document snapshot, builds its outline in the background and
//! prints the filtered result.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "outline")]
#[command(author = "Outline Contributors")]
#[command(version)]
#[command(about = "Searchable outlines for graph documents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to .outline/config.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config in the current directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Build and print the outline of a document
    Show {
        /// Document snapshot (JSON)
        document: PathBuf,

        /// Text query
        #[arg(short, long, default_value = "")]
        query: String,

        /// List matches as siblings instead of in their hierarchy
        #[arg(long)]
        flatten: bool,

        /// Filter chip, OR'ed with the other chips (repeatable)
        #[arg(long = "chip")]
        chips: Vec<String>,

        /// Graph path to limit the unfiltered outline to (repeatable)
        #[arg(long = "graph")]
        graphs: Vec<String>,

        /// Manager path to build (repeatable, defaults to all managers)
        #[arg(long = "manager")]
        managers: Vec<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show document and outline statistics
    Stats {
        /// Document snapshot (JSON)
        document: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Show {
            document,
            query,
            flatten,
            chips,
            graphs,
            managers,
            json,
        } => {
            let options = commands::ShowOptions {
                query,
                flatten,
                chips,
                graphs,
                managers,
                json,
            };
            commands::show(&document, cli.config.as_deref(), options).await
        }
        Commands::Stats { document } => commands::stats(&document, cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
