//! Read-only analyzers over a [`ReferenceGraph`] snapshot.
//!
//! Analyzers borrow the graph, hold no state between calls and return owned
//! results. Long traversals call [`Checkpoint::check`] at every node they
//! expand so a cancelled query stops promptly.

pub mod call_graph;
pub mod callers;
pub mod chains;
pub mod comprehensive;
pub mod cycles;
pub mod type_usage;
pub mod types;

pub use call_graph::CallGraphAnalyzer;
pub use callers::{CallFilter, CallerResolver};
pub use chains::ChainWalker;
pub use comprehensive::ComprehensiveAnalyzer;
pub use type_usage::TypeUsageAnalyzer;
pub use types::*;

use crate::error::{QueryError, QueryResult};
use crate::relationship::CallEdge;
use crate::storage::ReferenceGraph;
use crate::symbol::MethodSignature;
use crate::types::SymbolId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellation probe handed to traversals.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint<'a> {
    token: Option<&'a CancellationToken>,
    operation: &'static str,
}

impl<'a> Checkpoint<'a> {
    pub fn new(token: &'a CancellationToken, operation: &'static str) -> Self {
        Self {
            token: Some(token),
            operation,
        }
    }

    /// A checkpoint that never fires, for synchronous callers.
    pub fn never(operation: &'static str) -> Self {
        Self {
            token: None,
            operation,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn check(&self) -> QueryResult<()> {
        match self.token {
            Some(token) if token.is_cancelled() => Err(QueryError::Cancelled {
                operation: self.operation,
            }),
            _ => Ok(()),
        }
    }
}

/// Method key of `id`, or `None` (logged) when the graph references a symbol
/// missing from its catalog.
pub(crate) fn method_key(graph: &ReferenceGraph, id: SymbolId) -> Option<String> {
    match graph.symbol(id) {
        Some(symbol) => Some(symbol.qualified_name.to_string()),
        None => {
            debug!("[analysis] edge endpoint {} missing from catalog", id.value());
            None
        }
    }
}

pub(crate) fn signatures(graph: &ReferenceGraph, ids: &[SymbolId]) -> Vec<MethodSignature> {
    ids.iter()
        .filter_map(|&id| graph.catalog().signature(id).cloned())
        .collect()
}

/// Build a chain step from `from` to `to` over `edge`. `from`/`to` follow the
/// walk direction, not necessarily the edge direction.
pub(crate) fn chain_step(
    graph: &ReferenceGraph,
    from: SymbolId,
    to: SymbolId,
    edge: &CallEdge,
) -> Option<CallChainStep> {
    Some(CallChainStep {
        from_method: method_key(graph, from)?,
        to_method: method_key(graph, to)?,
        file_path: edge.location.file_path.to_string(),
        line: edge.location.line,
        column: edge.location.column,
        call_type: edge.kind,
        confidence: edge.confidence,
    })
}

pub(crate) fn require_positive_depth(max_depth: usize) -> QueryResult<()> {
    if max_depth == 0 {
        return Err(QueryError::invalid("max_depth", "must be at least 1"));
    }
    Ok(())
}
