//! Symbol reference graph and call-chain analysis.
//!
//! Front ends hand over per-file facts ([`FileFacts`]); the indexer resolves
//! them into an immutable [`ReferenceGraph`] snapshot, and the analyzers in
//! [`analysis`] answer caller, call-chain, call-graph and type-usage queries
//! against it.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexing;
pub mod io;
pub mod logging;
pub mod relationship;
pub mod service;
pub mod storage;
pub mod symbol;
pub mod types;

pub use analysis::{
    CallFilter, CallGraphAnalyzer, CallerResolver, ChainWalker, Checkpoint,
    ComprehensiveAnalyzer, TypeUsageAnalyzer,
};
pub use config::Settings;
pub use error::{IndexError, IndexResult, QueryError, QueryResult, SignatureError};
pub use indexing::{FileFacts, GraphIndexer, SymbolDeclaration, SyntacticForm, UsageSite};
pub use relationship::{CallEdge, CallKind, Confidence, SourceLocation, TypeUsageEdge, TypeUsageKind};
pub use service::{AnalysisService, IndexCapabilities};
pub use storage::{GraphStore, IndexData, IndexPersistence, ReferenceGraph};
pub use symbol::{MethodQuery, MethodSignature, Parameter, Symbol};
pub use types::{Accessibility, Range, SymbolId, SymbolKind};
