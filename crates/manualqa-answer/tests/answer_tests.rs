use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use manualqa_core::chunker::AdaptiveChunker;
use manualqa_core::config::DEFAULT_PROMPT_TEMPLATE;
use manualqa_core::error::{Error, Service};
use manualqa_core::pipeline::IngestionPipeline;
use manualqa_core::traits::{Embedder, Generator, IndexBuilder};
use manualqa_core::types::Passage;
use manualqa_embed::{FakeEmbedder, LexicalOverlapScorer};
use manualqa_retrieval::RetrievalEngine;
use manualqa_vector::MemoryIndexBuilder;
use manualqa_answer::{AnswerAssembler, Lifecycle, PromptTemplate, QaService};

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("model overloaded");
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("66,360 kg".to_string())
    }
}

const QUERY: &str = "What is the maximum landing weight performance?";

const PAGES: [&str; 4] = [
    "Hydraulic system A supplies the flight controls.",
    "Landing distance and maximum landing weight performance data: 66,360 kg.",
    "Maximum landing weight adjustments for landing flaps 30.",
    "Fuel system crossfeed valve operation.",
];

async fn engine(pages: &[&str]) -> RetrievalEngine {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::default());
    let pipeline = IngestionPipeline::new(AdaptiveChunker::new(800, 150));
    let passages: Vec<Passage> =
        (1u32..).zip(pages).flat_map(|(n, t)| pipeline.process_page(t, "fcom.txt", "fcom", n)).collect();
    let index = MemoryIndexBuilder::new(embedder.clone()).build(passages).await.expect("build");
    RetrievalEngine::new(embedder, Arc::new(index), Arc::new(LexicalOverlapScorer), 3, 9)
}

fn template() -> PromptTemplate {
    PromptTemplate::new(DEFAULT_PROMPT_TEMPLATE).unwrap()
}

#[tokio::test]
async fn single_passage_answer_cites_its_page() {
    let generator = Arc::new(RecordingGenerator::default());
    let assembler = AnswerAssembler::new(engine(&PAGES).await, generator.clone(), template());

    let answer = assembler.answer(QUERY).await.expect("answer");
    assert_eq!(answer.answer, "66,360 kg");
    assert_eq!(answer.pages, vec![2]);

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(PAGES[1]));
    assert!(!prompts[0].contains(PAGES[2]));
    assert!(prompts[0].contains(&format!("Question: {QUERY}")));
}

#[tokio::test]
async fn multiple_context_passages_are_joined_in_rank_order() {
    let generator = Arc::new(RecordingGenerator::default());
    let assembler =
        AnswerAssembler::new(engine(&PAGES).await, generator.clone(), template()).context_passages(2);

    let answer = assembler.answer(QUERY).await.expect("answer");
    assert_eq!(answer.pages, vec![2, 3]);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains(&format!("{}\n\n{}", PAGES[1], PAGES[2])));
}

#[tokio::test]
async fn empty_retrieval_never_calls_the_model() {
    let generator = Arc::new(RecordingGenerator::default());
    let assembler = AnswerAssembler::new(engine(&[]).await, generator.clone(), template());
    let err = assembler.answer(QUERY).await.unwrap_err();
    assert!(matches!(err, Error::NoRelevantContent));
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let assembler = AnswerAssembler::new(engine(&PAGES).await, Arc::new(RecordingGenerator::default()), template());
    assert!(matches!(assembler.answer("  \n").await, Err(Error::EmptyQuery)));
}

#[tokio::test]
async fn generator_failure_is_upstream() {
    let generator = Arc::new(RecordingGenerator { fail: true, ..Default::default() });
    let assembler = AnswerAssembler::new(engine(&PAGES).await, generator, template());
    let err = assembler.answer(QUERY).await.unwrap_err();
    assert!(matches!(err, Error::Upstream { service: Service::Generation, .. }));
}

#[tokio::test]
async fn service_rejects_queries_outside_the_ready_state() {
    let service = QaService::new();
    assert_eq!(service.lifecycle(), Lifecycle::Uninitialized);
    assert!(matches!(service.ask(QUERY).await, Err(Error::NotReady)));

    service.set_ready(AnswerAssembler::new(engine(&PAGES).await, Arc::new(RecordingGenerator::default()), template()));
    assert_eq!(service.lifecycle(), Lifecycle::Ready);
    assert_eq!(service.ask(QUERY).await.expect("ask").pages, vec![2]);

    service.shutdown();
    assert_eq!(service.lifecycle(), Lifecycle::ShutDown);
    assert!(matches!(service.ask(QUERY).await, Err(Error::NotReady)));

    service.set_ready(AnswerAssembler::new(engine(&PAGES).await, Arc::new(RecordingGenerator::default()), template()));
    assert_eq!(service.lifecycle(), Lifecycle::ShutDown);
}

#[tokio::test]
async fn concurrent_queries_share_the_service() {
    let service = Arc::new(QaService::ready(AnswerAssembler::new(
        engine(&PAGES).await,
        Arc::new(RecordingGenerator::default()),
        template(),
    )));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.ask(QUERY).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().expect("ask").pages, vec![2]);
    }
}
