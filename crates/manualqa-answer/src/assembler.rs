use std::sync::Arc;
use tracing::info;

use manualqa_core::config::AnswerSettings;
use manualqa_core::error::{Error, Result, Service};
use manualqa_core::traits::Generator;
use manualqa_core::types::{Answer, ScoredPassage};
use manualqa_retrieval::RetrievalEngine;

use crate::prompt::PromptTemplate;

/// Retrieves, builds one prompt from the top reranked passages and calls the
/// generative model once.
pub struct AnswerAssembler {
    engine: RetrievalEngine,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    context_passages: usize,
}

impl AnswerAssembler {
    pub fn new(engine: RetrievalEngine, generator: Arc<dyn Generator>, template: PromptTemplate) -> Self {
        Self { engine, generator, template, context_passages: 1 }
    }

    pub fn from_settings(engine: RetrievalEngine, generator: Arc<dyn Generator>, settings: &AnswerSettings) -> Result<Self> {
        let template = PromptTemplate::new(settings.prompt_template.clone())?;
        Ok(Self::new(engine, generator, template).context_passages(settings.context_passages))
    }

    /// Number of top passages joined into `{context}`; at least one.
    pub fn context_passages(mut self, n: usize) -> Self {
        self.context_passages = n.max(1);
        self
    }

    pub async fn answer(&self, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let ranked = self.engine.retrieve(query).await?;
        if ranked.is_empty() {
            return Err(Error::NoRelevantContent);
        }
        let selected = &ranked[..ranked.len().min(self.context_passages)];
        let prompt = self.template.render(&context_text(selected), query);
        let answer = self.generator.generate(&prompt).await.map_err(Error::upstream(Service::Generation))?;
        let pages = cited_pages(selected);
        info!(pages = ?pages, passages = selected.len(), "answer generated");
        Ok(Answer { answer, pages })
    }
}

fn context_text(selected: &[ScoredPassage]) -> String {
    selected.iter().map(|s| s.passage.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Distinct page numbers in rank order.
fn cited_pages(selected: &[ScoredPassage]) -> Vec<u32> {
    let mut pages = Vec::with_capacity(selected.len());
    for s in selected {
        let page = s.passage.page_number();
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    pages
}
