//! Document storage: the uploads directory and corpus loading.
//!
//! The store owns a single flat documents directory. Uploads are written
//! under their original filename (an existing file with the same name is
//! overwritten), listing produces a sorted snapshot, and `load_all`
//! dispatches each file to the matching extractor by extension.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ParseErrorPolicy;
use crate::extract;
use crate::models::{Document, DocumentFormat};

pub struct DocumentStore {
    docs_dir: PathBuf,
    on_parse_error: ParseErrorPolicy,
}

impl DocumentStore {
    /// Open the store, creating the documents directory if absent.
    /// Failure to create the directory is fatal to the caller.
    pub fn open(docs_dir: &Path, on_parse_error: ParseErrorPolicy) -> Result<Self> {
        std::fs::create_dir_all(docs_dir).with_context(|| {
            format!("Failed to create documents directory: {}", docs_dir.display())
        })?;
        Ok(Self {
            docs_dir: docs_dir.to_path_buf(),
            on_parse_error,
        })
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Write uploaded bytes into the documents directory.
    ///
    /// The name is reduced to its final path component, so an upload cannot
    /// escape the directory. A same-named file is silently overwritten.
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_filename(filename)
            .with_context(|| format!("Invalid upload filename: {:?}", filename))?;
        let path = self.docs_dir.join(&name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write upload: {}", path.display()))?;
        debug!(file = %name, bytes = bytes.len(), "saved upload");
        Ok(path)
    }

    /// Sorted snapshot of the stored document filenames, supported formats only.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.docs_dir).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if format_of(entry.path()).is_some() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load every stored document, dispatching by extension.
    ///
    /// Unrecognized extensions are skipped silently. Extraction failures
    /// follow the configured policy: `Skip` logs a warning and continues,
    /// `Abort` fails the whole load.
    pub fn load_all(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for name in self.list_documents()? {
            let path = self.docs_dir.join(&name);
            let format = match format_of(&path) {
                Some(f) => f,
                None => continue,
            };
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read document: {}", path.display()))?;
            match extract::extract_text(&bytes, format) {
                Ok(content) => {
                    debug!(file = %name, format = %format, chars = content.chars().count(), "loaded document");
                    documents.push(Document {
                        id: name,
                        source_path: path,
                        content,
                        format,
                    });
                }
                Err(e) => match self.on_parse_error {
                    ParseErrorPolicy::Skip => {
                        warn!(file = %name, error = %e, "skipping unparseable document");
                    }
                    ParseErrorPolicy::Abort => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to load document: {}", name)));
                    }
                },
            }
        }
        Ok(documents)
    }

    /// Fingerprint of the current document set: a digest over the sorted
    /// (name, size, mtime) triples of every supported file. Cheap enough to
    /// recompute before each question; changes whenever the set changes.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for name in self.list_documents()? {
            let path = self.docs_dir.join(&name);
            let metadata = std::fs::metadata(&path)?;
            let mtime = metadata
                .modified()
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            hasher.update(name.as_bytes());
            hasher.update(metadata.len().to_le_bytes());
            hasher.update(mtime.as_nanos().to_le_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

fn format_of(path: &Path) -> Option<DocumentFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension)
}

/// Reduce an upload name to a bare filename. Rejects names with no normal
/// component (`..`, `/`, empty).
fn sanitize_filename(filename: &str) -> Option<String> {
    let name = Path::new(filename)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .last()?;
    if name.is_empty() || name == ".." {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(tmp: &TempDir, policy: ParseErrorPolicy) -> DocumentStore {
        DocumentStore::open(&tmp.path().join("docs"), policy).unwrap()
    }

    #[test]
    fn upload_then_list_is_sorted_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        store.save_upload("b.txt", b"beta").unwrap();
        store.save_upload("a.txt", b"alpha").unwrap();
        assert_eq!(store.list_documents().unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn upload_overwrites_same_name() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        store.save_upload("a.txt", b"old").unwrap();
        store.save_upload("a.txt", b"new").unwrap();
        let docs = store.load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "new");
    }

    #[test]
    fn upload_name_cannot_escape_directory() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        let path = store.save_upload("../../evil.txt", b"x").unwrap();
        assert_eq!(path, store.docs_dir().join("evil.txt"));
        assert!(store.save_upload("..", b"x").is_err());
    }

    #[test]
    fn unrecognized_extensions_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        store.save_upload("notes.txt", b"kept").unwrap();
        std::fs::write(store.docs_dir().join("image.png"), b"\x89PNG").unwrap();
        assert_eq!(store.list_documents().unwrap(), vec!["notes.txt"]);
        let docs = store.load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].format, DocumentFormat::Txt);
    }

    #[test]
    fn parse_failure_skip_policy_continues() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        store.save_upload("bad.pdf", b"not a pdf").unwrap();
        store.save_upload("good.txt", b"fine").unwrap();
        let docs = store.load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "good.txt");
    }

    #[test]
    fn parse_failure_abort_policy_fails_load() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Abort);
        store.save_upload("bad.pdf", b"not a pdf").unwrap();
        store.save_upload("good.txt", b"fine").unwrap();
        assert!(store.load_all().is_err());
    }

    #[test]
    fn fingerprint_changes_with_document_set() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, ParseErrorPolicy::Skip);
        let empty = store.fingerprint().unwrap();
        store.save_upload("a.txt", b"alpha").unwrap();
        let one = store.fingerprint().unwrap();
        assert_ne!(empty, one);
        assert_eq!(one, store.fingerprint().unwrap());
        store.save_upload("b.txt", b"beta").unwrap();
        assert_ne!(one, store.fingerprint().unwrap());
    }
}
