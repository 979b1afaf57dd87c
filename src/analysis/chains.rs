//! Bounded call-chain enumeration.
//!
//! Walks are depth-first with a visited set scoped to the current path:
//! a node is inserted when the walk descends into it and removed on the way
//! back, so sibling branches may revisit nodes while each individual path
//! stays simple. The only repeated node a path may contain is its origin,
//! reached by the closing step of a recursive path.

use crate::analysis::{
    CallChainPath, CallChainResult, CallChainStep, Checkpoint, Direction, chain_step,
    require_positive_depth,
};
use crate::error::QueryResult;
use crate::relationship::CallEdge;
use crate::storage::ReferenceGraph;
use crate::symbol::MethodQuery;
use crate::types::SymbolId;
use std::collections::HashSet;

pub struct ChainWalker<'g> {
    graph: &'g ReferenceGraph,
}

/// Mutable state of one depth-first walk.
struct Walk<'c> {
    origin: SymbolId,
    max_depth: usize,
    steps: Vec<CallChainStep>,
    on_path: HashSet<SymbolId>,
    paths: Vec<CallChainPath>,
    checkpoint: Checkpoint<'c>,
}

impl<'c> Walk<'c> {
    fn new(origin: SymbolId, max_depth: usize, checkpoint: Checkpoint<'c>) -> Self {
        Self {
            origin,
            max_depth,
            steps: Vec::new(),
            on_path: HashSet::from([origin]),
            paths: Vec::new(),
            checkpoint,
        }
    }

    fn emit(&mut self, is_recursive: bool) {
        self.paths
            .push(CallChainPath::new(self.steps.clone(), is_recursive));
    }

    fn emit_with(&mut self, step: CallChainStep, is_recursive: bool) {
        self.steps.push(step);
        self.emit(is_recursive);
        self.steps.pop();
    }
}

impl<'g> ChainWalker<'g> {
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Every maximal simple path from each method matching `query`, bounded
    /// by `max_depth` steps.
    pub fn find_call_chains(
        &self,
        query: &MethodQuery,
        direction: Direction,
        max_depth: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<CallChainResult>> {
        query.validate()?;
        require_positive_depth(max_depth)?;
        let starts = self.graph.catalog().resolve_methods(query);
        if starts.is_empty() {
            return Ok(None);
        }

        let mut paths = Vec::new();
        for start in starts {
            let mut walk = Walk::new(start, max_depth, checkpoint);
            self.extend(&mut walk, start, direction)?;
            paths.append(&mut walk.paths);
        }

        let mut unique_methods: Vec<String> = Vec::new();
        for method in paths.iter().flat_map(|p| p.methods()) {
            if !unique_methods.iter().any(|m| m == method) {
                unique_methods.push(method.to_string());
            }
        }

        Ok(Some(CallChainResult {
            target: query.describe(),
            direction,
            max_depth,
            total_paths: paths.len(),
            recursive_paths: paths.iter().filter(|p| p.is_recursive).count(),
            longest_path: paths.iter().map(CallChainPath::length).max().unwrap_or(0),
            unique_methods,
            paths,
        }))
    }

    fn extend(
        &self,
        walk: &mut Walk<'_>,
        current: SymbolId,
        direction: Direction,
    ) -> QueryResult<()> {
        walk.checkpoint.check()?;
        if walk.steps.len() >= walk.max_depth {
            walk.emit(false);
            return Ok(());
        }

        let mut extended = false;
        for edge in self.neighbours(current, direction) {
            let next = match direction {
                Direction::Forward => edge.callee,
                Direction::Backward => edge.caller,
            };
            if next != walk.origin && walk.on_path.contains(&next) {
                continue;
            }
            let Some(step) = chain_step(self.graph, current, next, edge) else {
                continue;
            };

            extended = true;
            if next == walk.origin {
                walk.emit_with(step, true);
                continue;
            }

            walk.steps.push(step);
            walk.on_path.insert(next);
            let result = self.extend(walk, next, direction);
            walk.on_path.remove(&next);
            walk.steps.pop();
            result?;
        }

        if !extended && !walk.steps.is_empty() {
            walk.emit(false);
        }
        Ok(())
    }

    fn neighbours(
        &self,
        node: SymbolId,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = &'g CallEdge> + 'g> {
        match direction {
            Direction::Forward => Box::new(self.graph.outgoing(node)),
            Direction::Backward => Box::new(self.graph.incoming(node)),
        }
    }

    /// All simple forward paths from a `from` match to a `to` match.
    ///
    /// Paths continue past an intermediate target so longer routes to other
    /// targets are found too. When a method is both start and target, the
    /// paths returned for it are the cycles back to it.
    pub fn find_call_chains_between(
        &self,
        from: &MethodQuery,
        to: &MethodQuery,
        max_depth: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Vec<CallChainPath>> {
        from.validate()?;
        to.validate()?;
        require_positive_depth(max_depth)?;

        let targets: HashSet<SymbolId> = self
            .graph
            .catalog()
            .resolve_methods(to)
            .into_iter()
            .collect();
        let starts = self.graph.catalog().resolve_methods(from);
        if targets.is_empty() || starts.is_empty() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for start in starts {
            let mut walk = Walk::new(start, max_depth, checkpoint);
            self.paths_to(&mut walk, start, &targets)?;
            paths.append(&mut walk.paths);
        }
        Ok(paths)
    }

    /// Cycles leading back to each method matching `query`, covering direct
    /// self-calls and recursion through other methods.
    pub fn find_recursive_call_chains(
        &self,
        query: &MethodQuery,
        max_depth: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<Vec<CallChainPath>>> {
        query.validate()?;
        require_positive_depth(max_depth)?;
        let starts = self.graph.catalog().resolve_methods(query);
        if starts.is_empty() {
            return Ok(None);
        }

        let mut paths = Vec::new();
        for start in starts {
            let targets = HashSet::from([start]);
            let mut walk = Walk::new(start, max_depth, checkpoint);
            self.paths_to(&mut walk, start, &targets)?;
            paths.append(&mut walk.paths);
        }
        Ok(Some(paths))
    }

    fn paths_to(
        &self,
        walk: &mut Walk<'_>,
        current: SymbolId,
        targets: &HashSet<SymbolId>,
    ) -> QueryResult<()> {
        walk.checkpoint.check()?;
        if walk.steps.len() >= walk.max_depth {
            return Ok(());
        }

        for edge in self.graph.outgoing(current) {
            let next = edge.callee;
            let closes_cycle = next == walk.origin;
            if !closes_cycle && walk.on_path.contains(&next) {
                continue;
            }
            if closes_cycle && !targets.contains(&next) {
                continue;
            }
            let Some(step) = chain_step(self.graph, current, next, edge) else {
                continue;
            };

            if targets.contains(&next) {
                walk.emit_with(step.clone(), closes_cycle);
                if closes_cycle {
                    continue;
                }
            }

            walk.steps.push(step);
            walk.on_path.insert(next);
            let result = self.paths_to(walk, next, targets);
            walk.on_path.remove(&next);
            walk.steps.pop();
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::GraphFixture;
    use crate::error::QueryError;
    use tokio_util::sync::CancellationToken;

    fn chain_graph() -> ReferenceGraph {
        // A -> B -> C -> D, B -> D, D -> B
        GraphFixture::new()
            .class("App.Flow")
            .method("App.Flow", "A")
            .method("App.Flow", "B")
            .method("App.Flow", "C")
            .method("App.Flow", "D")
            .call("App.Flow.A", "App.Flow.B")
            .call("App.Flow.B", "App.Flow.C")
            .call("App.Flow.C", "App.Flow.D")
            .call("App.Flow.B", "App.Flow.D")
            .call("App.Flow.D", "App.Flow.B")
            .build()
    }

    fn query(name: &str) -> MethodQuery {
        MethodQuery::by_name(name, Some("App.Flow"))
    }

    fn assert_simple_except_origin(path: &CallChainPath) {
        let methods = path.methods();
        let (last, body) = methods.split_last().unwrap();
        let unique: HashSet<_> = body.iter().collect();
        assert_eq!(unique.len(), body.len(), "repeated method in {methods:?}");
        if path.is_recursive {
            assert_eq!(Some(*last), path.start_method());
        } else {
            assert!(!body.contains(last), "non-recursive path revisits {last}");
        }
    }

    #[test]
    fn test_forward_chains_are_maximal_simple_paths() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        let result = walker
            .find_call_chains(&query("A"), Direction::Forward, 10, Checkpoint::never("test"))
            .unwrap()
            .unwrap();

        let rendered: Vec<Vec<&str>> = result.paths.iter().map(|p| p.methods()).collect();
        assert_eq!(
            rendered,
            vec![
                vec!["App.Flow.A()", "App.Flow.B()", "App.Flow.C()", "App.Flow.D()"],
                vec!["App.Flow.A()", "App.Flow.B()", "App.Flow.D()"],
            ]
        );
        for path in &result.paths {
            assert!(path.length() <= 10);
            assert_simple_except_origin(path);
        }
        assert_eq!(result.recursive_paths, 0);
        assert_eq!(result.longest_path, 3);
    }

    #[test]
    fn test_depth_bound_is_respected() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        for depth in 1..=4 {
            let result = walker
                .find_call_chains(&query("A"), Direction::Forward, depth, Checkpoint::never("test"))
                .unwrap()
                .unwrap();
            assert!(result.paths.iter().all(|p| p.length() <= depth));
            assert!(!result.paths.is_empty());
        }
    }

    #[test]
    fn test_backward_steps_follow_traversal_order() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        let result = walker
            .find_call_chains(&query("C"), Direction::Backward, 5, Checkpoint::never("test"))
            .unwrap()
            .unwrap();

        let first = &result.paths[0];
        assert_eq!(first.start_method(), Some("App.Flow.C()"));
        assert_eq!(first.steps[0].to_method, "App.Flow.B()");
        for path in &result.paths {
            assert_simple_except_origin(path);
        }
    }

    #[test]
    fn test_recursion_closes_on_origin() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        let result = walker
            .find_call_chains(&query("B"), Direction::Forward, 5, Checkpoint::never("test"))
            .unwrap()
            .unwrap();

        assert_eq!(result.recursive_paths, 2);
        for path in result.paths.iter().filter(|p| p.is_recursive) {
            assert_eq!(path.end_method(), Some("App.Flow.B()"));
            assert_simple_except_origin(path);
        }
    }

    #[test]
    fn test_chains_between() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        let paths = walker
            .find_call_chains_between(&query("A"), &query("D"), 5, Checkpoint::never("test"))
            .unwrap();
        let lengths: Vec<usize> = paths.iter().map(CallChainPath::length).collect();
        assert_eq!(lengths, vec![3, 2]);
        assert!(paths.iter().all(|p| p.end_method() == Some("App.Flow.D()")));

        let none = walker
            .find_call_chains_between(&query("D"), &query("A"), 5, Checkpoint::never("test"))
            .unwrap();
        assert!(none.is_empty());

        let unknown = walker
            .find_call_chains_between(&query("Nope"), &query("A"), 5, Checkpoint::never("test"))
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_direct_recursion() {
        let graph = GraphFixture::new()
            .class("App.RecursiveService")
            .method("App.RecursiveService", "RecursiveMethod")
            .call(
                "App.RecursiveService.RecursiveMethod",
                "App.RecursiveService.RecursiveMethod",
            )
            .build();
        let walker = ChainWalker::new(&graph);

        let paths = walker
            .find_recursive_call_chains(
                &MethodQuery::by_name("RecursiveMethod", None),
                5,
                Checkpoint::never("test"),
            )
            .unwrap()
            .unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].length(), 1);
        assert!(paths[0].is_recursive);
    }

    #[test]
    fn test_zero_depth_is_invalid() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);

        let err = walker
            .find_call_chains(&query("A"), Direction::Forward, 0, Checkpoint::never("test"))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput { field: "max_depth", .. }));
    }

    #[test]
    fn test_cancelled_walk_fails() {
        let graph = chain_graph();
        let walker = ChainWalker::new(&graph);
        let token = CancellationToken::new();
        token.cancel();

        let err = walker
            .find_call_chains(
                &query("A"),
                Direction::Forward,
                5,
                Checkpoint::new(&token, "find_call_chains"),
            )
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
