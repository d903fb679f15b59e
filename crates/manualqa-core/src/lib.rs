//! Ingestion side of the manual question-answering system: metadata
//! extraction, adaptive chunking and the page pipeline, plus the shared data
//! model, error taxonomy, configuration and collaborator traits.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod splitter;
pub mod traits;
pub mod types;

pub use error::{Error, Result, Service};
