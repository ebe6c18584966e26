use clap::{Parser, Subcommand};
use polyglot_rag::Result;
use polyglot_rag::commands::{ask, chat, eval, ingest, retrieve};
use polyglot_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polyglot-rag")]
#[command(about = "Retrieval-augmented question answering over a Bangla/English corpus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

// The caller-facing top_k bound lives here, at the API boundary; the core
// tolerates any k >= 1.
const TOP_K_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

#[derive(Subcommand)]
enum Commands {
    /// Configure API credentials and retrieval policy
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest an extracted text file into a named knowledge base
    Ingest {
        /// Path to the extracted text file
        input: PathBuf,
        /// Knowledge base name
        #[arg(long, default_value = "bangla")]
        kb: String,
    },
    /// Retrieve the top-k chunks for a query, without generation
    Retrieve {
        /// Query text (Bangla or English)
        query: String,
        /// Number of context chunks to retrieve
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(TOP_K_RANGE))]
        top_k: u8,
        /// Knowledge base name
        #[arg(long, default_value = "bangla")]
        kb: String,
    },
    /// Ask a single question
    Ask {
        /// Question text (Bangla or English)
        query: String,
        /// Number of context chunks to retrieve
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(TOP_K_RANGE))]
        top_k: u8,
        /// Knowledge base name
        #[arg(long, default_value = "bangla")]
        kb: String,
    },
    /// Interactive chat with conversation memory
    Chat {
        /// Number of context chunks to retrieve per question
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(TOP_K_RANGE))]
        top_k: u8,
        /// Knowledge base name
        #[arg(long, default_value = "bangla")]
        kb: String,
    },
    /// Score a TOML suite of query/expected pairs
    Eval {
        /// Path to the TOML evaluation suite
        tests: PathBuf,
        /// Number of context chunks to retrieve per question
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(TOP_K_RANGE))]
        top_k: u8,
        /// Knowledge base name
        #[arg(long, default_value = "bangla")]
        kb: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { input, kb } => {
            ingest(&input, &kb)?;
        }
        Commands::Retrieve { query, top_k, kb } => {
            retrieve(&query, top_k.into(), &kb)?;
        }
        Commands::Ask { query, top_k, kb } => {
            ask(&query, top_k.into(), &kb)?;
        }
        Commands::Chat { top_k, kb } => {
            chat(top_k.into(), &kb)?;
        }
        Commands::Eval { tests, top_k, kb } => {
            eval(&tests, top_k.into(), &kb)?;
        }
    }

    Ok(())
}
