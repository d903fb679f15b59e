use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunker::AdaptiveChunker;
use crate::error::{Error, Result, Service};
use crate::loader::DocumentLoader;
use crate::metadata;
use crate::traits::{IndexBuilder, PageLoader};
use crate::types::{PageMetadata, Passage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source: String,
    pub doc_id: String,
    pub pages: usize,
    pub passages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
    pub total_passages: usize,
}

/// Passages of a whole run, in document then page order.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub passages: Vec<Passage>,
    pub report: IngestReport,
}

/// Load -> extract -> chunk for every page of every document.
///
/// A document that cannot be loaded fails the whole run before anything is
/// handed to the index builder. Blank or malformed pages yield no passages
/// but still count as pages.
pub struct IngestionPipeline<L = DocumentLoader> {
    loader: L,
    chunker: AdaptiveChunker,
    aircraft_type: Option<String>,
}

impl IngestionPipeline<DocumentLoader> {
    pub fn new(chunker: AdaptiveChunker) -> Self {
        Self::with_loader(DocumentLoader, chunker)
    }
}

impl<L: PageLoader> IngestionPipeline<L> {
    pub fn with_loader(loader: L, chunker: AdaptiveChunker) -> Self {
        Self { loader, chunker, aircraft_type: None }
    }

    pub fn aircraft_type(mut self, aircraft_type: Option<String>) -> Self {
        self.aircraft_type = aircraft_type;
        self
    }

    pub fn page_metadata(&self, text: &str, source: &str, doc_id: &str, page_number: u32) -> PageMetadata {
        PageMetadata {
            source: source.to_string(),
            doc_id: doc_id.to_string(),
            page_number,
            char_count: text.chars().count(),
            aircraft_type: self.aircraft_type.clone(),
            tags: metadata::extract(text),
        }
    }

    pub fn process_page(&self, text: &str, source: &str, doc_id: &str, page_number: u32) -> Vec<Passage> {
        let page = self.page_metadata(text, source, doc_id, page_number);
        self.chunker.chunk(text, &page)
    }

    pub fn process_document(&self, path: &Path, doc_id: &str) -> Result<(Vec<Passage>, DocumentReport)> {
        let source = path.to_string_lossy().to_string();
        let pages = self.loader.load(path).map_err(|e| Error::DocumentLoad {
            document: source.clone(),
            reason: format!("{e:#}"),
        })?;
        debug!(document = %source, pages = pages.len(), "loaded pages");

        let mut passages = Vec::new();
        for (number, text) in (1u32..).zip(pages.iter()) {
            passages.extend(self.process_page(text, &source, doc_id, number));
        }
        let report = DocumentReport {
            source,
            doc_id: doc_id.to_string(),
            pages: pages.len(),
            passages: passages.len(),
        };
        info!(document = %report.source, pages = report.pages, passages = report.passages, "document chunked");
        Ok((passages, report))
    }

    pub fn process(&self, documents: &[PathBuf]) -> Result<Ingested> {
        let doc_ids = assign_doc_ids(documents);
        let mut passages = Vec::new();
        let mut report = IngestReport::default();
        for (path, doc_id) in documents.iter().zip(doc_ids.iter()) {
            let (doc_passages, doc_report) = self.process_document(path, doc_id)?;
            passages.extend(doc_passages);
            report.documents.push(doc_report);
        }
        ensure_unique_ids(&passages)?;
        report.total_passages = passages.len();
        info!(documents = report.documents.len(), passages = report.total_passages, "ingestion chunking completed");
        Ok(Ingested { passages, report })
    }

    /// Processes all documents and hands the full passage set to `builder`.
    pub async fn run<B: IndexBuilder>(&self, documents: &[PathBuf], builder: &B) -> Result<(B::Handle, IngestReport)> {
        let Ingested { passages, report } = self.process(documents)?;
        let handle = builder.build(passages).await.map_err(Error::upstream(Service::IndexBuild))?;
        Ok((handle, report))
    }
}

/// File stems, suffixed with `-<ordinal>` (1-based) when stems collide.
pub fn assign_doc_ids(documents: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = documents
        .iter()
        .map(|p| p.file_stem().map_or_else(|| "document".to_string(), |s| s.to_string_lossy().to_string()))
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }
    let mut used: HashSet<String> = HashSet::new();
    stems
        .iter()
        .enumerate()
        .map(|(i, stem)| {
            let mut ordinal = i + 1;
            let mut id = if counts[stem.as_str()] > 1 { format!("{stem}-{ordinal}") } else { stem.clone() };
            while !used.insert(id.clone()) {
                ordinal += 1;
                id = format!("{stem}-{ordinal}");
            }
            id
        })
        .collect()
}

fn ensure_unique_ids(passages: &[Passage]) -> Result<()> {
    let mut seen = HashSet::with_capacity(passages.len());
    for p in passages {
        if !seen.insert(p.chunk_id()) {
            return Err(Error::DuplicateChunkId(p.chunk_id().to_string()));
        }
    }
    Ok(())
}
