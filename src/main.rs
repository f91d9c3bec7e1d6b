//! # corpus-chat CLI (`cchat`)
//!
//! The `cchat` binary wraps the library's surfaces: directory setup,
//! document upload and listing, the interactive chat session, and the
//! HTTP API server. Every document- or chat-touching command passes
//! through the access gate first.
//!
//! ## Usage
//!
//! ```bash
//! cchat --config ./config/cchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cchat init` | Create the documents and history directories |
//! | `cchat docs` | List stored documents |
//! | `cchat upload <files...>` | Copy documents into the store |
//! | `cchat chat` | Start an interactive gated chat session |
//! | `cchat serve` | Start the HTTP API server |

mod auth;
mod chunk;
mod config;
mod embedding;
mod engine;
mod export;
mod extract;
mod history;
mod index;
mod llm;
mod models;
mod repl;
mod server;
mod session;
mod store;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::store::DocumentStore;

/// corpus-chat — a password-gated, document-grounded chat assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cchat",
    about = "corpus-chat — a password-gated, document-grounded chat assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the documents and history directories.
    ///
    /// Idempotent; failure to create either directory is fatal.
    Init,

    /// List stored documents (supported formats only).
    Docs {
        /// Access secret; prompted for when omitted.
        #[arg(long)]
        secret: Option<String>,
    },

    /// Copy one or more documents into the store.
    ///
    /// Files keep their original name; an existing document with the same
    /// name is overwritten.
    Upload {
        /// Files to upload (.pdf, .docx, .txt).
        files: Vec<PathBuf>,

        /// Access secret; prompted for when omitted.
        #[arg(long)]
        secret: Option<String>,
    },

    /// Start an interactive chat session.
    ///
    /// Prompts for the access secret, then answers questions against the
    /// uploaded documents. `:save` and `:report` export the session
    /// history; `:quit` ends it.
    Chat,

    /// Start the HTTP API server.
    ///
    /// Serves upload, listing, ask, and export endpoints, gated by the
    /// `x-access-secret` header.
    Serve,
}

/// Pass the access gate for a one-shot CLI command: use the `--secret`
/// flag when given, otherwise prompt. Wrong secret means nothing runs.
fn require_access(config: &config::Config, secret: Option<String>) -> Result<()> {
    let gate = auth::gate_from_config(config)?;
    let supplied = match secret {
        Some(s) => s,
        None => {
            print!("Access secret: ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if !gate.authorize(&supplied) {
        bail!("Access denied.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("corpus_chat=info,cchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&cfg.storage.docs_dir)?;
            std::fs::create_dir_all(&cfg.storage.history_dir)?;
            println!("Directories created:");
            println!("  documents: {}", cfg.storage.docs_dir.display());
            println!("  history:   {}", cfg.storage.history_dir.display());
        }
        Commands::Docs { secret } => {
            require_access(&cfg, secret)?;
            let store = DocumentStore::open(&cfg.storage.docs_dir, cfg.ingest.on_parse_error)?;
            let documents = store.list_documents()?;
            if documents.is_empty() {
                println!("No documents uploaded.");
            }
            for name in documents {
                println!("{}", name);
            }
        }
        Commands::Upload { files, secret } => {
            if files.is_empty() {
                bail!("No files given.");
            }
            require_access(&cfg, secret)?;
            let store = DocumentStore::open(&cfg.storage.docs_dir, cfg.ingest.on_parse_error)?;
            for file in &files {
                let name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file.display()))?;
                let bytes = std::fs::read(file)?;
                store.save_upload(name, &bytes)?;
                println!("saved: {}", name);
            }
        }
        Commands::Chat => {
            repl::run_chat(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
