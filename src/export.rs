//! Session history export.
//!
//! Two durable artifacts, both timestamp-named (`chat_<YYYY-MM-DD_HH-MM-SS>`):
//! - **snapshot** (`.json`) — an ordered array of `{question, answer}`
//!   objects; round-trips through [`load_snapshot`].
//! - **report** (`.txt`) — a printable rendering, each turn as two labeled
//!   text blocks followed by a blank line, pages separated by form feeds.
//!
//! Export never mutates the history. Content is written to a temporary
//! sibling and renamed into place, so a failed export leaves no partial
//! file. A name collision (two exports within the same second) is resolved
//! with a numeric suffix, never by overwriting.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::history::SessionHistory;

/// Turns rendered per report page.
const REPORT_TURNS_PER_PAGE: usize = 5;

#[derive(Serialize, Deserialize)]
struct SnapshotTurn {
    question: String,
    answer: String,
}

/// Write the history as a structured JSON snapshot. Returns the path.
pub fn export_snapshot(history: &SessionHistory, dir: &Path) -> Result<PathBuf> {
    export_snapshot_at(history, dir, Utc::now())
}

pub(crate) fn export_snapshot_at(
    history: &SessionHistory,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    let turns: Vec<SnapshotTurn> = history
        .as_pairs()
        .into_iter()
        .map(|(question, answer)| SnapshotTurn { question, answer })
        .collect();
    let json = serde_json::to_string_pretty(&turns)?;

    let path = write_artifact(dir, at, "json", json.as_bytes())?;
    info!(turns = history.len(), path = %path.display(), "exported snapshot");
    Ok(path)
}

/// Re-load a snapshot into ordered (question, answer) pairs.
#[allow(dead_code)]
pub fn load_snapshot(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let turns: Vec<SnapshotTurn> =
        serde_json::from_str(&content).with_context(|| "Failed to parse snapshot")?;
    Ok(turns
        .into_iter()
        .map(|t| (t.question, t.answer))
        .collect())
}

/// Write the history as a paginated printable report. Returns the path.
pub fn export_report(history: &SessionHistory, dir: &Path) -> Result<PathBuf> {
    export_report_at(history, dir, Utc::now())
}

pub(crate) fn export_report_at(
    history: &SessionHistory,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    let text = render_report(history);
    let path = write_artifact(dir, at, "txt", text.as_bytes())?;
    info!(turns = history.len(), path = %path.display(), "exported report");
    Ok(path)
}

fn render_report(history: &SessionHistory) -> String {
    let pairs = history.as_pairs();
    let mut out = String::new();

    for (page, turns) in pairs.chunks(REPORT_TURNS_PER_PAGE).enumerate() {
        if page > 0 {
            out.push('\u{c}');
        }
        for (question, answer) in turns {
            out.push_str("Question:\n");
            out.push_str(question);
            out.push_str("\n\nAnswer:\n");
            out.push_str(answer);
            out.push_str("\n\n");
        }
    }

    out
}

/// Pick a collision-free `chat_<timestamp>.<ext>` name in `dir`, write the
/// content to a temporary sibling, and rename it into place.
fn write_artifact(dir: &Path, at: DateTime<Utc>, ext: &str, content: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;

    let stem = format!("chat_{}", at.format("%Y-%m-%d_%H-%M-%S"));
    let path = unique_path(dir, &stem, ext);

    let tmp = path.with_extension(format!("{}.tmp", ext));
    let write_result = std::fs::write(&tmp, content)
        .with_context(|| format!("Failed to write export: {}", tmp.display()))
        .and_then(|_| {
            std::fs::rename(&tmp, &path)
                .with_context(|| format!("Failed to finalize export: {}", path.display()))
        });
    if write_result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    write_result?;

    Ok(path)
}

fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 2;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
