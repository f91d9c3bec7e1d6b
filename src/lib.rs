//! # corpus-chat
//!
//! A password-gated, document-grounded chat assistant.
//!
//! Uploaded documents (PDF, DOCX, TXT) are extracted, split into
//! overlapping chunks, embedded, and held in an in-memory vector index.
//! Questions retrieve the most relevant chunks and are answered by a chat
//! model that sees those excerpts plus the full prior session history.
//! Session transcripts export as a JSON snapshot or a printable report.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │ Uploads  │──▶│   Pipeline     │──▶│  In-memory   │
//! │ pdf/docx │   │ Extract+Chunk │   │ vector index │
//! │   /txt   │   │    +Embed     │   └──────┬──────┘
//! └──────────┘   └───────────────┘          │ retrieve
//!                                           ▼
//!                 ┌──────────┐      ┌───────────────┐
//!                 │ History  │◀─────│  Conversation  │──▶ chat model
//!                 │ + export │      │    engine      │
//!                 └──────────┘      └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cchat init                        # create docs/ and history/ dirs
//! cchat upload strategy.pdf         # add a document
//! cchat chat                        # interactive gated session
//! cchat serve                       # HTTP API for UI front ends
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`auth`] | Access gating |
//! | [`store`] | Documents directory: uploads, listing, corpus loading |
//! | [`extract`] | Per-format text extraction |
//! | [`chunk`] | Overlapping-window text chunking |
//! | [`embedding`] | Embedding provider integration |
//! | [`index`] | In-memory vector index and retrieval |
//! | [`llm`] | Chat model backends |
//! | [`engine`] | Retrieval-augmented answering |
//! | [`history`] | Session turn log |
//! | [`export`] | History snapshots and printable reports |
//! | [`session`] | Session orchestration and index lifecycle |
//! | [`repl`] | Interactive terminal session |
//! | [`server`] | HTTP API server |

pub mod auth;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod export;
pub mod extract;
pub mod history;
pub mod index;
pub mod llm;
pub mod models;
pub mod repl;
pub mod server;
pub mod session;
pub mod store;
