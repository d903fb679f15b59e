//! Answer generation: prompt rendering, the Gemini client, the assembler
//! that turns a query into `{answer, pages}`, and the lifecycle-aware
//! service that rejects queries until ingestion has completed.

pub mod assembler;
pub mod gemini;
pub mod prompt;
pub mod service;

pub use assembler::AnswerAssembler;
pub use gemini::GeminiGenerator;
pub use prompt::PromptTemplate;
pub use service::{Lifecycle, QaService};
