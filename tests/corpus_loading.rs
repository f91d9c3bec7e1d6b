//! Corpus loading and chunking over real files on disk.
//!
//! Exercises the store → extract → chunk path with hand-built fixtures:
//! a minimal DOCX (ZIP with `word/document.xml`), plain-text files, and
//! deliberately corrupt bytes for the failure policies.

use std::io::Write;
use tempfile::TempDir;

use corpus_chat::chunk;
use corpus_chat::config::{ChunkingConfig, ParseErrorPolicy};
use corpus_chat::models::DocumentFormat;
use corpus_chat::store::DocumentStore;

/// Minimal docx (ZIP) containing word/document.xml with the given phrase.
fn minimal_docx_with_text(phrase: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn open_store(tmp: &TempDir, policy: ParseErrorPolicy) -> DocumentStore {
    DocumentStore::open(&tmp.path().join("docs"), policy).unwrap()
}

#[test]
fn docx_round_trips_through_the_store() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, ParseErrorPolicy::Skip);

    store
        .save_upload("strategy.docx", &minimal_docx_with_text("office test phrase"))
        .unwrap();

    let docs = store.load_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "strategy.docx");
    assert_eq!(docs[0].format, DocumentFormat::Docx);
    assert!(docs[0].content.contains("office test phrase"));
}

#[test]
fn mixed_corpus_loads_supported_files_only() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, ParseErrorPolicy::Skip);

    store.save_upload("notes.txt", b"plain notes").unwrap();
    store
        .save_upload("deck.docx", &minimal_docx_with_text("deck contents"))
        .unwrap();
    std::fs::write(store.docs_dir().join("script.py"), b"print('no')").unwrap();

    let docs = store.load_all().unwrap();
    let mut ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, ["deck.docx", "notes.txt"]);
}

#[test]
fn corrupt_files_follow_the_configured_policy() {
    let tmp = TempDir::new().unwrap();

    let store = open_store(&tmp, ParseErrorPolicy::Skip);
    store.save_upload("bad.pdf", b"not a valid pdf").unwrap();
    store.save_upload("bad.docx", b"not a zip").unwrap();
    store.save_upload("good.txt", b"still loads").unwrap();
    let docs = store.load_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "good.txt");

    let strict = DocumentStore::open(store.docs_dir(), ParseErrorPolicy::Abort).unwrap();
    let err = strict.load_all().unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load document"));
}

#[test]
fn uploaded_txt_chunks_per_the_configured_window() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, ParseErrorPolicy::Skip);

    let body: String = (0..2500).map(|i| ((i % 26) as u8 + b'a') as char).collect();
    store.save_upload("long.txt", body.as_bytes()).unwrap();

    let docs = store.load_all().unwrap();
    let chunks = chunk::split_documents(
        &docs,
        &ChunkingConfig {
            chunk_size: 1000,
            chunk_overlap: 200,
        },
    );

    assert_eq!(chunks.len(), 4);
    for pair in chunks.windows(2) {
        // Consecutive chunks of one document share a 200-char overlap.
        assert_eq!(pair[1].offset, pair[0].offset + 800);
        let shared_end = (pair[0].offset + pair[0].length).min(pair[1].offset + pair[1].length);
        let shared = &body[pair[1].offset..shared_end];
        assert!(pair[1].text.starts_with(shared));
    }
}
