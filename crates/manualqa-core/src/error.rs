use std::fmt;
use thiserror::Error;

/// External collaborator that failed during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Embedding,
    VectorIndex,
    IndexBuild,
    CrossEncoder,
    Generation,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Embedding => "embedding",
            Service::VectorIndex => "vector index",
            Service::IndexBuild => "index build",
            Service::CrossEncoder => "cross-encoder",
            Service::Generation => "generative model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load document '{document}': {reason}")]
    DocumentLoad { document: String, reason: String },

    #[error("Service unavailable: ingestion has not completed")]
    NotReady,

    #[error("No relevant content found")]
    NoRelevantContent,

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunkId(String),

    #[error("Upstream {service} failure: {source:#}")]
    Upstream {
        service: Service,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn upstream(service: Service) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Error::Upstream { service, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
