//! Page loaders: text files split on form feeds, and PDFs.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::traits::PageLoader;

/// Page break emitted by `pdftotext` and most text exports.
pub const PAGE_BREAK: char = '\u{000C}';

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "pdf"];

/// Plain text with form-feed page breaks; a file without any is one page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PagedTextLoader;

impl PageLoader for PagedTextLoader {
    fn load(&self, document: &Path) -> Result<Vec<String>> {
        let content = read_file_content(document)?;
        Ok(content.split(PAGE_BREAK).map(str::to_string).collect())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PageLoader for PdfLoader {
    fn load(&self, document: &Path) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed inputs; surface that as an error
        let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(document)
        }))
            .map_err(|_| anyhow!("PDF extraction panicked"))?
            .map_err(|e| anyhow!("PDF extraction failed: {}", e))?;
        Ok(pages)
    }
}

/// Dispatches on the file extension: `.pdf` to [`PdfLoader`], anything else
/// to [`PagedTextLoader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentLoader;

impl PageLoader for DocumentLoader {
    fn load(&self, document: &Path) -> Result<Vec<String>> {
        match extension(document).as_deref() {
            Some("pdf") => PdfLoader.load(document),
            _ => PagedTextLoader.load(document),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_lowercase)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Expands directories into their supported files (sorted); files are kept
/// as given, in order. Missing paths are kept so the loader reports them.
pub fn expand_documents(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut documents = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            documents.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| extension(p).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str())))
            .collect();
        found.sort();
        documents.extend(found);
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn form_feeds_separate_pages() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fcom.txt");
        fs::write(&path, "page one\u{000C}page two\u{000C}").unwrap();
        let pages = PagedTextLoader.load(&path).unwrap();
        assert_eq!(pages, vec!["page one", "page two", ""]);
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("legacy.txt");
        fs::write(&path, [b'o', b'k', 0xFF]).unwrap();
        let pages = DocumentLoader.load(&path).unwrap();
        assert_eq!(pages, vec!["ok\u{FFFD}"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(DocumentLoader.load(Path::new("/nonexistent/manual.txt")).is_err());
    }

    #[test]
    fn directories_expand_to_sorted_supported_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("notes.md"), "skip").unwrap();
        let explicit = PathBuf::from("explicit.txt");
        let docs = expand_documents(&[tmp.path().to_path_buf(), explicit.clone()]);
        assert_eq!(docs, vec![tmp.path().join("a.txt"), tmp.path().join("b.txt"), explicit]);
    }
}
