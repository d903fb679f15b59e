//! Content-aware page chunking.

use crate::config::ChunkingSettings;
use crate::metadata::aircraft_systems;
use crate::splitter::{RecursiveSplitter, MANUAL_SEPARATORS, TABLE_SEPARATORS};
use crate::types::{chunk_id, PageMetadata, Passage, PassageMetadata};

/// How a page is cut, chosen from its classification and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Procedure or checklist within 1.5x the base size: kept verbatim.
    Whole,
    /// Performance tables: twice the base window, structural breaks only.
    Table,
    Standard,
}

#[derive(Debug, Clone)]
pub struct AdaptiveChunker {
    chunk_size: usize,
    standard: RecursiveSplitter,
    table: RecursiveSplitter,
}

impl AdaptiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            standard: RecursiveSplitter::new(chunk_size, chunk_overlap, &MANUAL_SEPARATORS),
            table: RecursiveSplitter::new(chunk_size * 2, chunk_overlap, &TABLE_SEPARATORS),
        }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn strategy(&self, text: &str, page: &PageMetadata) -> Strategy {
        // len <= 1.5 * chunk_size, kept in integers
        let fits_relaxed = 2 * text.chars().count() <= 3 * self.chunk_size;
        if page.tags.content_type.is_sequential() && fits_relaxed {
            Strategy::Whole
        } else if page.tags.has_performance_data {
            Strategy::Table
        } else {
            Strategy::Standard
        }
    }

    /// Cuts one page into passages, left to right. Deterministic for equal
    /// input; blank pages yield nothing.
    pub fn chunk(&self, text: &str, page: &PageMetadata) -> Vec<Passage> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let pieces = match self.strategy(text, page) {
            Strategy::Whole => vec![text.to_string()],
            Strategy::Table => self.table.split(text),
            Strategy::Standard => self.standard.split(text),
        };
        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| {
                let metadata = PassageMetadata {
                    page: page.clone(),
                    chunk_index,
                    total_chunks,
                    chunk_systems: aircraft_systems(&piece),
                    chunk_id: chunk_id(&page.doc_id, page.page_number, chunk_index),
                };
                Passage { text: piece, metadata }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;
    use crate::types::{AircraftSystem, ContentType};

    fn page_for(text: &str) -> PageMetadata {
        PageMetadata {
            source: "manual.txt".to_string(),
            doc_id: "manual".to_string(),
            page_number: 7,
            char_count: text.chars().count(),
            aircraft_type: None,
            tags: metadata::extract(text),
        }
    }

    #[test]
    fn fitting_procedure_is_kept_verbatim() {
        let chunker = AdaptiveChunker::new(40, 5);
        // 55 chars: over the base size, within 1.5x
        let text = "Procedure: Engine Start\n\nStarter switch GRD.\nMonitor N2";
        let page = page_for(text);
        assert_eq!(page.tags.content_type, ContentType::Procedure);
        assert_eq!(chunker.strategy(text, &page), Strategy::Whole);

        let passages = chunker.chunk(text, &page);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, text);
        assert_eq!(passages[0].metadata.chunk_index, 0);
        assert_eq!(passages[0].metadata.total_chunks, 1);
        assert_eq!(passages[0].metadata.chunk_id, "manual:p7_c0");
        assert_eq!(passages[0].metadata.chunk_systems, vec![AircraftSystem::Engines]);
    }

    #[test]
    fn table_page_with_trailing_blank_line_yields_no_blank_passage() {
        let chunker = AdaptiveChunker::new(10, 0);
        let text = format!("Weight table\n{}", " ".repeat(40));
        let page = page_for(&text);
        assert_eq!(chunker.strategy(&text, &page), Strategy::Table);

        let passages = chunker.chunk(&text, &page);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "Weight table");
        assert_eq!(passages[0].metadata.total_chunks, 1);
    }

    #[test]
    fn oversized_procedure_falls_through_to_splitting() {
        let chunker = AdaptiveChunker::new(20, 0);
        let text = "Procedure: Engine Start. Starter switch to GRD. Fuel control switch to RUN.";
        let page = page_for(text);
        assert_eq!(chunker.strategy(text, &page), Strategy::Standard);
        assert!(chunker.chunk(text, &page).len() > 1);
    }

    #[test]
    fn performance_pages_use_wide_windows() {
        let chunker = AdaptiveChunker::new(30, 0);
        let text = "Landing weight table\nWEIGHT 50000 55000 60000\nFLAPS 30 1450 1520 1600";
        let page = page_for(text);
        assert!(page.tags.has_performance_data);
        assert_eq!(chunker.strategy(text, &page), Strategy::Table);

        let passages = chunker.chunk(text, &page);
        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| p.text.chars().count() <= 60));
        assert_eq!(passages[1].text, "FLAPS 30 1450 1520 1600");
    }

    #[test]
    fn passages_inherit_page_metadata_and_rescan_systems() {
        let chunker = AdaptiveChunker::new(40, 0);
        let text = "The hydraulic pumps pressurize.\n\nThe battery bus powers standby.";
        let page = page_for(text);
        let passages = chunker.chunk(text, &page);
        assert_eq!(passages.len(), 2);
        for (i, p) in passages.iter().enumerate() {
            assert_eq!(p.metadata.page, page);
            assert_eq!(p.metadata.chunk_index, i);
            assert_eq!(p.metadata.total_chunks, 2);
        }
        assert_eq!(passages[0].metadata.chunk_systems, vec![AircraftSystem::Hydraulic]);
        assert_eq!(passages[1].metadata.chunk_systems, vec![AircraftSystem::Electrical]);
    }

    #[test]
    fn blank_page_yields_nothing() {
        let chunker = AdaptiveChunker::new(30, 0);
        assert!(chunker.chunk(" \n\t", &page_for(" \n\t")).is_empty());
    }
}
