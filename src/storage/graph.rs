//! The reference graph and its snapshot store.

use crate::indexing::TypeHierarchy;
use crate::relationship::{CallEdge, TypeUsageEdge};
use crate::symbol::{Symbol, SymbolCatalog};
use crate::types::SymbolId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable once published: symbols, call edges and type usages.
///
/// Edges are kept in insertion order; the adjacency maps store positions into
/// the edge vectors so every traversal sees edges in the order they were
/// recorded.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    catalog: SymbolCatalog,
    hierarchy: TypeHierarchy,
    call_edges: Vec<CallEdge>,
    outgoing: HashMap<SymbolId, Vec<usize>>,
    incoming: HashMap<SymbolId, Vec<usize>>,
    type_usages: Vec<TypeUsageEdge>,
    usages_by_type: HashMap<SymbolId, Vec<usize>>,
    file_count: usize,
}

impl ReferenceGraph {
    pub fn new(catalog: SymbolCatalog, hierarchy: TypeHierarchy, file_count: usize) -> Self {
        Self {
            catalog,
            hierarchy,
            file_count,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Record a call edge unless one already exists at the same call site.
    pub fn add_call_edge(&mut self, edge: CallEdge) -> bool {
        let duplicate = self
            .outgoing
            .get(&edge.caller)
            .into_iter()
            .flatten()
            .any(|&idx| self.call_edges[idx].same_site(&edge));
        if duplicate {
            return false;
        }

        let idx = self.call_edges.len();
        self.outgoing.entry(edge.caller).or_default().push(idx);
        self.incoming.entry(edge.callee).or_default().push(idx);
        self.call_edges.push(edge);
        true
    }

    pub fn add_type_usage(&mut self, usage: TypeUsageEdge) {
        let idx = self.type_usages.len();
        self.usages_by_type
            .entry(usage.used_type)
            .or_default()
            .push(idx);
        self.type_usages.push(usage);
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.catalog.get(id)
    }

    pub fn call_edges(&self) -> &[CallEdge] {
        &self.call_edges
    }

    /// Calls made by `caller`, in insertion order.
    pub fn outgoing(&self, caller: SymbolId) -> impl Iterator<Item = &CallEdge> {
        self.edges_at(self.outgoing.get(&caller))
    }

    /// Calls into `callee`, in insertion order.
    pub fn incoming(&self, callee: SymbolId) -> impl Iterator<Item = &CallEdge> {
        self.edges_at(self.incoming.get(&callee))
    }

    fn edges_at<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a CallEdge> {
        positions
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.call_edges.get(idx))
    }

    pub fn type_usages(&self) -> &[TypeUsageEdge] {
        &self.type_usages
    }

    pub fn usages_of_type(&self, type_id: SymbolId) -> impl Iterator<Item = &TypeUsageEdge> {
        self.usages_by_type
            .get(&type_id)
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.type_usages.get(idx))
    }

    /// Catalog type that owns `symbol`: the declaring type of a method, or
    /// the type itself.
    pub fn owning_type(&self, symbol: SymbolId) -> Option<SymbolId> {
        let symbol = self.catalog.get(symbol)?;
        if symbol.is_type() {
            return Some(symbol.id);
        }
        self.catalog
            .by_qualified_name(symbol.owning_type())
            .filter(|owner| owner.is_type())
            .map(|owner| owner.id)
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn call_edge_count(&self) -> usize {
        self.call_edges.len()
    }

    pub fn direct_edge_count(&self) -> usize {
        self.call_edges.iter().filter(|edge| edge.is_direct()).count()
    }

    pub fn type_usage_count(&self) -> usize {
        self.type_usages.len()
    }
}

/// Holder of the currently published graph.
///
/// Readers clone the `Arc` and keep working on that snapshot while a writer
/// builds and publishes the next one.
#[derive(Debug)]
pub struct GraphStore {
    current: RwLock<Arc<ReferenceGraph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_graph(ReferenceGraph::empty())
    }

    pub fn with_graph(graph: ReferenceGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    pub fn snapshot(&self) -> Arc<ReferenceGraph> {
        self.current.read().clone()
    }

    pub fn publish(&self, graph: ReferenceGraph) {
        let graph = Arc::new(graph);
        *self.current.write() = graph;
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
