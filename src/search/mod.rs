pub mod cache;
pub mod index;
pub mod query;

pub use index::ScriptSearchIndex;
