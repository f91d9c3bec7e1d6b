//! Interactive chat session for the terminal.
//!
//! Mirrors the upload/ask/export surface: the user authenticates once,
//! then asks free-form questions. Inline commands (`:docs`, `:save`,
//! `:report`, `:quit`) cover the non-question actions. A generation
//! failure prints an error and leaves the session (and its history)
//! intact.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

use crate::auth;
use crate::config::Config;
use crate::export;
use crate::llm;
use crate::session::Session;
use crate::store::DocumentStore;

pub async fn run_chat(config: &Config) -> Result<()> {
    let gate = auth::gate_from_config(config)?;
    let interactive = atty::is(atty::Stream::Stdin);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    if interactive {
        print!("Access secret: ");
        std::io::stdout().flush()?;
    }
    let supplied = match lines.next() {
        Some(line) => line?,
        None => bail!("Access denied."),
    };
    if !gate.authorize(supplied.trim_end_matches(['\r', '\n'])) {
        bail!("Access denied.");
    }

    let store = DocumentStore::open(&config.storage.docs_dir, config.ingest.on_parse_error)?;
    let backend = llm::create_backend(&config.llm)?;
    let mut session = Session::new();

    let documents = store.list_documents()?;
    println!("{} document(s) in {}", documents.len(), store.docs_dir().display());
    if interactive {
        println!("Ask a question, or :docs / :save / :report / :quit");
    }

    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = line.trim();

        match input {
            "" => continue,
            ":quit" | ":q" => break,
            ":docs" => {
                let documents = store.list_documents()?;
                if documents.is_empty() {
                    println!("No documents uploaded.");
                }
                for name in documents {
                    println!("  {}", name);
                }
            }
            ":save" => {
                if session.history().is_empty() {
                    println!("Nothing to save yet.");
                    continue;
                }
                match export::export_snapshot(session.history(), &config.storage.history_dir) {
                    Ok(path) => println!("History saved: {}", path.display()),
                    Err(e) => eprintln!("Export failed: {:#}", e),
                }
            }
            ":report" => {
                if session.history().is_empty() {
                    println!("Nothing to save yet.");
                    continue;
                }
                match export::export_report(session.history(), &config.storage.history_dir) {
                    Ok(path) => println!("Report saved: {}", path.display()),
                    Err(e) => eprintln!("Export failed: {:#}", e),
                }
            }
            question => {
                match session.ask(config, &store, backend.as_ref(), question).await {
                    Ok(answer) => {
                        println!("{}", answer);
                        println!();
                    }
                    // The turn is discarded; the session keeps going.
                    Err(e) => eprintln!("Error: {:#}", e),
                }
            }
        }
    }

    Ok(())
}
