// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads every .txt and .docx file in a directory into a
// Document. Plain text is read as UTF-8; .docx files are ZIP
// archives of XML, parsed with docx-rs and flattened to one
// line per non-empty paragraph:
//
//   Document → Paragraph → Run → Text
//
// Files are visited in name order so a seeded run sees the
// corpus in the same order on every platform. A file that
// fails to parse is skipped with a warning.
//
// Reference: docx-rs crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

pub struct CorpusLoader {
    dir: PathBuf,
}

impl CorpusLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.dir.exists() {
            tracing::warn!("corpus directory '{}' does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            let loaded = match path.extension().and_then(|e| e.to_str()) {
                Some("txt")  => load_text(&path),
                Some("docx") => load_docx(&path),
                _            => continue,
            };
            match loaded {
                Ok(doc) => {
                    tracing::debug!("loaded {} ({} chars)", doc.source, doc.text.len());
                    docs.push(doc);
                }
                Err(e) => tracing::warn!("skipping '{}': {e:#}", path.display()),
            }
        }

        tracing::info!("loaded {} documents from '{}'", docs.len(), self.dir.display());
        Ok(docs)
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn load_text(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Document::new(source_name(path), text))
}

fn load_docx(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let docx = read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("docx parse error in '{}': {e:?}", path.display()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(Document::new(source_name(path), paragraphs.join("\n")))
}

/// Runs of one paragraph are fragments of the same sentence,
/// so they are concatenated without a separator.
fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_directory_is_empty_corpus() {
        let loader = CorpusLoader::new("/definitely/not/a/corpus/dir");
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_reads_text_files_in_name_order() {
        let dir = scratch_dir("txt");
        fs::write(dir.join("b.txt"), "second file").unwrap();
        fs::write(dir.join("a.txt"), "first file").unwrap();
        fs::write(dir.join("notes.md"), "ignored").unwrap();

        let docs = CorpusLoader::new(&dir).load_all().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "a.txt");
        assert_eq!(docs[1].text, "second file");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_broken_docx_is_skipped() {
        let dir = scratch_dir("docx");
        fs::write(dir.join("broken.docx"), b"not a zip").unwrap();
        fs::write(dir.join("ok.txt"), "fine").unwrap();

        let docs = CorpusLoader::new(&dir).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "ok.txt");

        fs::remove_dir_all(&dir).unwrap();
    }
}
