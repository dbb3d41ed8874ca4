pub mod adapter;
pub mod dedup;
pub mod memory;
pub mod writer;

pub use adapter::{Store, TableProbe, WriteOutcome, MAX_BATCH_ITEMS};
pub use dedup::{ProcessedIds, ResetBoundary};
pub use memory::MemoryStore;
pub use writer::{BatchWriter, WriteSummary};

use std::pin::Pin;

/// Boxed stream alias for lazy query results.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;
