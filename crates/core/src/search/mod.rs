//! Filtered, paginated search over the catalog.

mod engine;
mod types;

pub use engine::{SearchConfig, SearchEngine};
pub use types::*;
