//! CampusFed CLI: the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `serve`    Start the HTTP gateway
//! - `ask`      Answer one question from the terminal
//! - `extract`  Merge extracted document text into a student's profile
//! - `config`   Inspect the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "campusfed",
    about = "CampusFed: Federated query orchestration for student eligibility",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.campusfed/config.toml)
    #[arg(short, long, global = true, env = "CAMPUSFED_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question
    Ask {
        /// The question, e.g. "which scholarships am I eligible for?"
        question: String,

        /// Ask as this logged-in student
        #[arg(short, long)]
        student_id: Option<i64>,

        /// Print the plan, the fetched context and the answer as JSON
        #[arg(long)]
        trace: bool,
    },

    /// Update a student's profile from text extracted out of a document
    Extract {
        #[arg(short, long)]
        student_id: i64,

        /// Document type as uploaded, e.g. "Income Certificate"
        #[arg(short, long)]
        document_type: String,

        /// Extracted text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the extracted text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the config, listing warnings
    Validate,
    /// Print the effective config (API key redacted)
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), campusfed_gateway::BoxError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config).await?,
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask {
            question,
            student_id,
            trace,
        } => commands::ask::run(config, question, student_id, trace).await?,
        Commands::Extract {
            student_id,
            document_type,
            text,
            file,
        } => commands::extract::run(config, student_id, document_type, text, file.as_deref()).await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config).await?,
            ConfigAction::Show => commands::config_cmd::show(config).await?,
            ConfigAction::Path => commands::config_cmd::path(config).await?,
        },
    }

    Ok(())
}

/// Logs go to stderr so `ask` output stays pipeable.
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
