use crate::analysis::cycles::{self, Adjacency};
use crate::analysis::{
    CallChainPath, CallGraphResult, Checkpoint, CircularDependency, ReachableMethodsResult,
    chain_step, method_key, signatures,
};
use crate::error::{QueryError, QueryResult};
use crate::relationship::CallEdge;
use crate::storage::ReferenceGraph;
use crate::symbol::{MethodQuery, Symbol};
use crate::types::{SymbolId, namespace_matches, type_name_matches};
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Which methods a call-graph query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope<'a> {
    Type(&'a str),
    Namespace(&'a str),
}

impl Scope<'_> {
    fn contains(&self, symbol: &Symbol) -> bool {
        symbol.is_method()
            && match self {
                Scope::Type(name) => type_name_matches(symbol.owning_type(), name),
                Scope::Namespace(ns) => namespace_matches(symbol.namespace(), ns),
            }
    }

    fn describe(&self) -> String {
        match self {
            Scope::Type(name) => format!("type:{name}"),
            Scope::Namespace(ns) => format!("namespace:{ns}"),
        }
    }
}

pub struct CallGraphAnalyzer<'g> {
    graph: &'g ReferenceGraph,
}

impl<'g> CallGraphAnalyzer<'g> {
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Subgraph of calls made from or into the selected type or namespace.
    /// Exactly one of `type_name` and `namespace` must be given.
    pub fn analyze_call_graph(
        &self,
        type_name: Option<&str>,
        namespace: Option<&str>,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<CallGraphResult> {
        let type_name = type_name.map(str::trim).filter(|s| !s.is_empty());
        let namespace = namespace.map(str::trim).filter(|s| !s.is_empty());
        let scope = match (type_name, namespace) {
            (Some(name), None) => Scope::Type(name),
            (None, Some(ns)) => Scope::Namespace(ns),
            _ => {
                return Err(QueryError::invalid(
                    "scope",
                    "exactly one of type name or namespace is required",
                ));
            }
        };

        let in_scope = |id: SymbolId| self.graph.symbol(id).is_some_and(|s| scope.contains(s));
        let mut call_graph: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut reverse_call_graph: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut methods: IndexSet<String> = IndexSet::new();
        let mut total_edges = 0;

        for edge in self.graph.call_edges() {
            checkpoint.check()?;
            if !in_scope(edge.caller) && !in_scope(edge.callee) {
                continue;
            }
            let (Some(caller), Some(callee)) = (
                method_key(self.graph, edge.caller),
                method_key(self.graph, edge.callee),
            ) else {
                continue;
            };

            total_edges += 1;
            methods.insert(caller.clone());
            methods.insert(callee.clone());
            call_graph
                .entry(caller.clone())
                .or_default()
                .insert(callee.clone());
            reverse_call_graph.entry(callee).or_default().insert(caller);
        }

        for symbol in self.graph.catalog().methods().filter(|s| scope.contains(s)) {
            methods.insert(symbol.qualified_name.to_string());
        }

        let entry_points = methods
            .iter()
            .filter(|m| {
                self.graph
                    .catalog()
                    .by_qualified_name(m)
                    .is_some_and(|s| scope.contains(s))
            })
            .filter(|m| !reverse_call_graph.contains_key(m.as_str()))
            .cloned()
            .collect();

        Ok(CallGraphResult {
            scope: scope.describe(),
            call_graph: into_lists(call_graph),
            reverse_call_graph: into_lists(reverse_call_graph),
            total_methods: methods.len(),
            methods: methods.into_iter().collect(),
            entry_points,
            total_edges,
        })
    }

    /// Simple call cycles, optionally restricted to methods inside
    /// `namespace_filter`. Cycles longer than `max_cycle_length` are omitted.
    pub fn find_circular_dependencies(
        &self,
        namespace_filter: Option<&str>,
        max_cycle_length: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Vec<CircularDependency>> {
        let namespace_filter = namespace_filter.map(str::trim).filter(|s| !s.is_empty());
        let in_filter = |id: SymbolId| match namespace_filter {
            None => true,
            Some(ns) => self
                .graph
                .symbol(id)
                .is_some_and(|s| namespace_matches(s.namespace(), ns)),
        };

        let mut adjacency = Adjacency::new();
        for edge in self.graph.call_edges() {
            if in_filter(edge.caller) && in_filter(edge.callee) {
                adjacency.add_edge(edge.caller, edge.callee);
            }
        }

        let mut found = Vec::new();
        for component in cycles::strongly_connected_components(&adjacency, checkpoint)? {
            if !cycles::is_cyclic(&adjacency, &component) {
                continue;
            }
            for cycle in cycles::simple_cycles(&adjacency, &component, max_cycle_length, checkpoint)? {
                if let Some(dependency) = self.circular_dependency(&cycle) {
                    found.push(dependency);
                }
            }
        }

        debug!("[call_graph] found {} call cycles", found.len());
        Ok(found)
    }

    fn circular_dependency(&self, cycle: &[SymbolId]) -> Option<CircularDependency> {
        let mut steps = Vec::with_capacity(cycle.len());
        for (i, &from) in cycle.iter().enumerate() {
            let to = cycle[(i + 1) % cycle.len()];
            let edge = self.graph.outgoing(from).find(|e| e.callee == to)?;
            steps.push(chain_step(self.graph, from, to, edge)?);
        }

        let mut files_involved: Vec<String> = Vec::new();
        for symbol in cycle.iter().filter_map(|&id| self.graph.symbol(id)) {
            if !files_involved.iter().any(|f| f.as_str() == &*symbol.file_path) {
                files_involved.push(symbol.file_path.to_string());
            }
        }

        Some(CircularDependency {
            methods: steps.iter().map(|s| s.from_method.clone()).collect(),
            cycle_length: steps.len(),
            confidence: CallChainPath::new(steps.clone(), true).confidence(),
            files_involved,
            steps,
        })
    }

    /// Methods reachable from `query` within `max_depth` calls, bucketed by
    /// the depth at which each was first reached.
    pub fn find_reachable_methods(
        &self,
        query: &MethodQuery,
        max_depth: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<ReachableMethodsResult>> {
        query.validate()?;
        let starts = self.graph.catalog().resolve_methods(query);
        if starts.is_empty() {
            return Ok(None);
        }

        let mut visited: HashSet<SymbolId> = starts.iter().copied().collect();
        let mut queue: VecDeque<(SymbolId, usize)> = starts.iter().map(|&s| (s, 0)).collect();
        let mut reachable_methods = Vec::new();
        let mut methods_by_depth: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            checkpoint.check()?;

            for edge in self.graph.outgoing(current) {
                if !visited.insert(edge.callee) {
                    continue;
                }
                let Some(key) = method_key(self.graph, edge.callee) else {
                    continue;
                };
                reachable_methods.push(key.clone());
                methods_by_depth.entry(depth + 1).or_default().push(key);
                queue.push_back((edge.callee, depth + 1));
            }
        }

        Ok(Some(ReachableMethodsResult {
            start_method: query.describe(),
            start_signatures: signatures(self.graph, &starts),
            max_depth,
            total_reachable: reachable_methods.len(),
            reachable_methods,
            methods_by_depth,
        }))
    }

    /// Fewest-calls path from any `from` match to any `to` match. When a
    /// method is both, the shortest cycle back to it is returned.
    pub fn find_shortest_path(
        &self,
        from: &MethodQuery,
        to: &MethodQuery,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<CallChainPath>> {
        from.validate()?;
        to.validate()?;
        let starts = self.graph.catalog().resolve_methods(from);
        let targets: HashSet<SymbolId> = self
            .graph
            .catalog()
            .resolve_methods(to)
            .into_iter()
            .collect();
        if starts.is_empty() || targets.is_empty() {
            return Ok(None);
        }

        let mut parent: HashMap<SymbolId, &CallEdge> = HashMap::new();
        let mut visited: HashSet<SymbolId> = starts.iter().copied().collect();
        let mut queue: VecDeque<SymbolId> = starts.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            checkpoint.check()?;
            for edge in self.graph.outgoing(current) {
                if targets.contains(&edge.callee) {
                    return Ok(self.rebuild_path(edge, &parent));
                }
                if visited.insert(edge.callee) {
                    parent.insert(edge.callee, edge);
                    queue.push_back(edge.callee);
                }
            }
        }

        Ok(None)
    }

    fn rebuild_path(
        &self,
        last: &CallEdge,
        parent: &HashMap<SymbolId, &CallEdge>,
    ) -> Option<CallChainPath> {
        let mut edges = vec![last];
        let mut current = last.caller;
        while let Some(&edge) = parent.get(&current) {
            edges.push(edge);
            current = edge.caller;
        }
        edges.reverse();

        let steps = edges
            .iter()
            .map(|edge| chain_step(self.graph, edge.caller, edge.callee, edge))
            .collect::<Option<Vec<_>>>()?;
        let is_recursive = steps.first().map(|s| &s.from_method) == steps.last().map(|s| &s.to_method);
        Some(CallChainPath::new(steps, is_recursive))
    }
}

fn into_lists(map: IndexMap<String, IndexSet<String>>) -> IndexMap<String, Vec<String>> {
    map.into_iter()
        .map(|(key, values)| (key, values.into_iter().collect()))
        .collect()
}
