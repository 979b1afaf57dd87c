pub mod builder;
pub mod facts;
pub mod hierarchy;
pub mod indexer;

pub use builder::{BuildStats, GraphBuilder};
pub use facts::{FileFacts, SymbolDeclaration, SyntacticForm, UsageSite};
pub use hierarchy::TypeHierarchy;
pub use indexer::GraphIndexer;
