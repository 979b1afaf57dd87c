//! One-shot reports combining the individual analyzers.

use crate::analysis::{
    CallFilter, CallGraphAnalyzer, CallerResolver, ChainWalker, Checkpoint, Direction,
    MethodAnalysis, TypeAnalysis, TypeUsageAnalyzer, signatures,
};
use crate::error::QueryResult;
use crate::storage::ReferenceGraph;
use crate::symbol::MethodQuery;

pub struct ComprehensiveAnalyzer<'g> {
    graph: &'g ReferenceGraph,
}

impl<'g> ComprehensiveAnalyzer<'g> {
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Callers, callees, caller chains, recursion and reachable set of a
    /// method. `None` when the query matches no method.
    pub fn analyze_method(
        &self,
        query: &MethodQuery,
        max_depth: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<MethodAnalysis>> {
        query.validate()?;
        let targets = self.graph.catalog().resolve_methods(query);
        if targets.is_empty() {
            return Ok(None);
        }

        let resolver = CallerResolver::new(self.graph);
        let walker = ChainWalker::new(self.graph);
        let call_graph = CallGraphAnalyzer::new(self.graph);

        Ok(Some(MethodAnalysis {
            method: query.describe(),
            signatures: signatures(self.graph, &targets),
            callers: resolver.find_callers(query, CallFilter::All, checkpoint)?,
            callees: resolver.find_callees(query, CallFilter::All, checkpoint)?,
            caller_chains: walker.find_call_chains(
                query,
                Direction::Backward,
                max_depth,
                checkpoint,
            )?,
            recursive_chains: walker
                .find_recursive_call_chains(query, max_depth, checkpoint)?
                .unwrap_or_default(),
            reachable: call_graph.find_reachable_methods(query, max_depth, checkpoint)?,
        }))
    }

    /// Usages, inheritance and dependencies of a type. `None` when no type
    /// matches `type_name`.
    pub fn analyze_type(
        &self,
        type_name: &str,
        max_cycle_length: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeAnalysis>> {
        let analyzer = TypeUsageAnalyzer::new(self.graph);
        let Some(usages) = analyzer.find_type_usages(type_name, checkpoint)? else {
            return Ok(None);
        };

        Ok(Some(TypeAnalysis {
            type_name: type_name.to_string(),
            inheritance: analyzer.analyze_inheritance(type_name, checkpoint)?,
            dependencies: analyzer.analyze_type_dependencies(
                type_name,
                max_cycle_length,
                checkpoint,
            )?,
            usages: Some(usages),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::GraphFixture;
    use crate::error::QueryError;
    use tokio_util::sync::CancellationToken;

    fn graph() -> ReferenceGraph {
        GraphFixture::new()
            .class("App.Manager")
            .class("App.Service")
            .method("App.Manager", "Run")
            .method("App.Service", "Execute")
            .method("App.Service", "Retry")
            .call("App.Manager.Run", "App.Service.Execute")
            .call("App.Service.Execute", "App.Service.Retry")
            .call("App.Service.Retry", "App.Service.Execute")
            .build()
    }

    #[test]
    fn test_analyze_method() {
        let graph = graph();
        let analyzer = ComprehensiveAnalyzer::new(&graph);

        let report = analyzer
            .analyze_method(
                &MethodQuery::by_name("Execute", Some("Service")),
                5,
                Checkpoint::never("test"),
            )
            .unwrap()
            .unwrap();

        assert_eq!(report.signatures.len(), 1);
        assert_eq!(report.callers.as_ref().unwrap().total_callers, 2);
        assert_eq!(report.callees.as_ref().unwrap().total_callees, 1);
        assert_eq!(report.recursive_chains.len(), 1);
        assert!(report.recursive_chains[0].is_recursive);
        assert_eq!(report.reachable.as_ref().unwrap().total_reachable, 1);
        assert!(report.caller_chains.is_some());
    }

    #[test]
    fn test_unknown_targets() {
        let graph = graph();
        let analyzer = ComprehensiveAnalyzer::new(&graph);

        assert!(
            analyzer
                .analyze_method(&MethodQuery::by_name("Nope", None), 5, Checkpoint::never("test"))
                .unwrap()
                .is_none()
        );
        assert!(
            analyzer
                .analyze_type("Nope", 12, Checkpoint::never("test"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_analyze_type() {
        let graph = graph();
        let analyzer = ComprehensiveAnalyzer::new(&graph);

        let report = analyzer
            .analyze_type("Service", 12, Checkpoint::never("test"))
            .unwrap()
            .unwrap();

        assert_eq!(report.usages.as_ref().unwrap().total_usages, 1);
        assert_eq!(
            report.inheritance.as_ref().unwrap().inheritance_chain,
            vec!["App.Service"]
        );
        assert!(!report.dependencies.as_ref().unwrap().has_circular_dependencies);
    }

    #[test]
    fn test_cancelled_analysis() {
        let graph = graph();
        let analyzer = ComprehensiveAnalyzer::new(&graph);
        let token = CancellationToken::new();
        token.cancel();

        let err = analyzer
            .analyze_method(
                &MethodQuery::by_name("Execute", None),
                5,
                Checkpoint::new(&token, "analyze_method"),
            )
            .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled { operation: "analyze_method" }));

        let err = analyzer
            .analyze_type("Service", 12, Checkpoint::new(&token, "analyze_type"))
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
