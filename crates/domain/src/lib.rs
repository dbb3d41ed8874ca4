pub mod cancel;
pub mod config;
pub mod error;
pub mod family;
pub mod record;
pub mod report;
pub mod window;

pub use error::{Error, Result};
pub use family::Family;
pub use record::CanonicalRecord;
