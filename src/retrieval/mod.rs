pub mod splitter;
pub mod store;

pub use splitter::TextSplitter;
pub use store::{reorder_for_long_context, VectorStore};
