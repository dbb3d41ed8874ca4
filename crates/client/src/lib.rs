pub mod api;
pub mod fetch;
pub mod governor;
pub mod outcome;
pub mod traverse;
pub mod util;

pub use cm_domain::cancel::{self, CancelToken};
pub use fetch::{Page, PageError, PageFetch, PageResponse};
pub use governor::RateGovernor;
pub use outcome::FetchOutcome;

use std::pin::Pin;

/// Boxed stream alias used by the traversal engine.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;
