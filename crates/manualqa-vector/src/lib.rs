//! Vector index collaborators: a persistent LanceDB index guarded by an
//! ingestion manifest, and an in-memory cosine index.

pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use memory::{MemoryIndex, MemoryIndexBuilder};
pub use search::LanceVectorIndex;
pub use table::IngestionManifest;
pub use writer::LanceIndexBuilder;
