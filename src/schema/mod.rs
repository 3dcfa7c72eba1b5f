//! The schema write path: typed schema access, rule indexing and definition.

/// Applies schema batches.
pub mod definer;
/// Indexes rules by the types they mention.
pub mod rule_indexer;
/// Typed reads and writes over the schema store.
pub mod type_manager;

pub use definer::Definer;
pub use rule_indexer::{RuleIndex, RuleIndexer};
pub use type_manager::TypeManager;
