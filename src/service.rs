//! Async entry point over the reference graph.
//!
//! Index mutations go through a single [`GraphIndexer`] behind a
//! `tokio::sync::Mutex`. Queries take a snapshot of the published graph and
//! run on the blocking pool, checking their [`CancellationToken`] at every
//! node they expand.

use crate::analysis::{
    CallChainPath, CallChainResult, CallFilter, CallGraphAnalyzer, CallGraphResult,
    CalleeResult, CallerResolver, CallerResult, ChainWalker, Checkpoint, CircularDependency,
    ComprehensiveAnalyzer, Direction, InheritanceAnalysis, MethodAnalysis,
    ReachableMethodsResult, TypeAnalysis, TypeDependencyAnalysis, TypeRefactoringOpportunities,
    TypeUsageAnalyzer, TypeUsageResult,
};
use crate::config::Settings;
use crate::debug_event;
use crate::error::{IndexResult, QueryError, QueryResult};
use crate::indexing::{BuildStats, FileFacts, GraphIndexer};
use crate::log_event;
use crate::storage::{GraphStore, IndexData, IndexPersistence, ReferenceGraph};
use crate::symbol::{MethodQuery, MethodSignature};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Operations answered by [`AnalysisService`].
pub const SUPPORTED_OPERATIONS: &[&str] = &[
    "find_callers",
    "find_callers_by_signature",
    "find_direct_callers",
    "find_indirect_callers",
    "find_callees",
    "find_callees_by_signature",
    "find_call_chains",
    "find_call_chains_between",
    "find_recursive_call_chains",
    "analyze_call_graph",
    "find_circular_dependencies",
    "find_reachable_methods",
    "find_shortest_path",
    "find_type_usages",
    "find_type_usages_by_full_name",
    "find_instantiations",
    "find_interface_implementations",
    "find_generic_usages",
    "analyze_inheritance",
    "analyze_type_dependencies",
    "find_refactoring_opportunities",
    "analyze_method",
    "analyze_type",
];

/// What the current snapshot contains.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCapabilities {
    pub ready: bool,
    pub indexed_files: usize,
    pub types: usize,
    pub methods: usize,
    pub call_edges: usize,
    pub type_usage_edges: usize,
    pub supported_operations: Vec<String>,
}

pub struct AnalysisService {
    store: Arc<GraphStore>,
    indexer: Mutex<GraphIndexer>,
    settings: Arc<Settings>,
}

impl AnalysisService {
    /// Service over an empty index.
    pub fn new(settings: Arc<Settings>) -> Self {
        let store = Arc::new(GraphStore::new());
        Self {
            indexer: Mutex::new(GraphIndexer::new(Arc::clone(&store))),
            store,
            settings,
        }
    }

    /// Service over previously collected facts.
    pub fn from_data(data: IndexData, settings: Arc<Settings>) -> IndexResult<Self> {
        let store = Arc::new(GraphStore::new());
        let indexer = GraphIndexer::from_data(data, Arc::clone(&store))?;
        Ok(Self {
            indexer: Mutex::new(indexer),
            store,
            settings,
        })
    }

    /// Load the fact store from disk. A missing store yields an empty index.
    pub fn open(persistence: &IndexPersistence, settings: Arc<Settings>) -> IndexResult<Self> {
        if !persistence.exists() {
            log_event!("service", "no fact store", "{}", persistence.facts_path().display());
            return Ok(Self::new(settings));
        }
        Self::from_data(persistence.load()?, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The graph readers currently see.
    pub fn snapshot(&self) -> Arc<ReferenceGraph> {
        self.store.snapshot()
    }

    pub async fn index_file(&self, path: &str, facts: FileFacts) -> IndexResult<bool> {
        self.indexer.lock().await.index_file(path, facts)
    }

    pub async fn index_files(
        &self,
        files: impl IntoIterator<Item = (String, FileFacts)>,
    ) -> IndexResult<usize> {
        self.indexer.lock().await.index_files(files)
    }

    pub async fn remove_file(&self, path: &str) -> bool {
        self.indexer.lock().await.remove_file(path)
    }

    /// Replace every file's facts at once.
    pub async fn replace_all(&self, data: IndexData) -> IndexResult<()> {
        self.indexer.lock().await.replace_all(data)
    }

    pub async fn last_build(&self) -> BuildStats {
        self.indexer.lock().await.last_build()
    }

    /// Write the fact store behind the current graph.
    pub async fn save(&self, persistence: &IndexPersistence) -> IndexResult<()> {
        let indexer = self.indexer.lock().await;
        persistence.save(indexer.data())
    }

    pub fn capabilities(&self) -> IndexCapabilities {
        let graph = self.snapshot();
        let catalog = graph.catalog();
        IndexCapabilities {
            ready: graph.file_count() > 0,
            indexed_files: graph.file_count(),
            types: catalog.type_count(),
            methods: catalog.method_count(),
            call_edges: graph.call_edge_count(),
            type_usage_edges: graph.type_usage_count(),
            supported_operations: SUPPORTED_OPERATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    // Callers and callees

    pub async fn find_callers(
        &self,
        method_name: &str,
        containing_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallerResult>> {
        let query = MethodQuery::by_name(method_name, containing_type);
        self.callers("find_callers", query, CallFilter::All, cancel)
            .await
    }

    pub async fn find_callers_by_signature(
        &self,
        signature: MethodSignature,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallerResult>> {
        self.callers("find_callers_by_signature", signature.into(), CallFilter::All, cancel)
            .await
    }

    pub async fn find_direct_callers(
        &self,
        method_name: &str,
        containing_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallerResult>> {
        let query = MethodQuery::by_name(method_name, containing_type);
        self.callers("find_direct_callers", query, CallFilter::Direct, cancel)
            .await
    }

    pub async fn find_indirect_callers(
        &self,
        method_name: &str,
        containing_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallerResult>> {
        let query = MethodQuery::by_name(method_name, containing_type);
        self.callers("find_indirect_callers", query, CallFilter::Indirect, cancel)
            .await
    }

    /// Caller lookup for any query shape and edge filter.
    pub async fn callers(
        &self,
        operation: &'static str,
        query: MethodQuery,
        filter: CallFilter,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallerResult>> {
        self.run(operation, cancel, move |graph, cp| {
            CallerResolver::new(graph).find_callers(&query, filter, cp)
        })
        .await
    }

    pub async fn find_callees(
        &self,
        method_name: &str,
        containing_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CalleeResult>> {
        let query = MethodQuery::by_name(method_name, containing_type);
        self.callees("find_callees", query, CallFilter::All, cancel)
            .await
    }

    pub async fn find_callees_by_signature(
        &self,
        signature: MethodSignature,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CalleeResult>> {
        self.callees("find_callees_by_signature", signature.into(), CallFilter::All, cancel)
            .await
    }

    pub async fn callees(
        &self,
        operation: &'static str,
        query: MethodQuery,
        filter: CallFilter,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CalleeResult>> {
        self.run(operation, cancel, move |graph, cp| {
            CallerResolver::new(graph).find_callees(&query, filter, cp)
        })
        .await
    }

    // Chains

    pub async fn find_call_chains(
        &self,
        query: MethodQuery,
        direction: Direction,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallChainResult>> {
        let depth = self.depth(max_depth)?;
        self.run("find_call_chains", cancel, move |graph, cp| {
            ChainWalker::new(graph).find_call_chains(&query, direction, depth, cp)
        })
        .await
    }

    pub async fn find_call_chains_between(
        &self,
        from: MethodQuery,
        to: MethodQuery,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<CallChainPath>> {
        let depth = self.depth(max_depth)?;
        self.run("find_call_chains_between", cancel, move |graph, cp| {
            ChainWalker::new(graph).find_call_chains_between(&from, &to, depth, cp)
        })
        .await
    }

    pub async fn find_recursive_call_chains(
        &self,
        query: MethodQuery,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<Vec<CallChainPath>>> {
        let depth = self.depth(max_depth)?;
        self.run("find_recursive_call_chains", cancel, move |graph, cp| {
            ChainWalker::new(graph).find_recursive_call_chains(&query, depth, cp)
        })
        .await
    }

    // Graph-wide

    pub async fn analyze_call_graph(
        &self,
        type_name: Option<&str>,
        namespace: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<CallGraphResult> {
        let type_name = type_name.map(str::to_string);
        let namespace = namespace.map(str::to_string);
        self.run("analyze_call_graph", cancel, move |graph, cp| {
            CallGraphAnalyzer::new(graph).analyze_call_graph(
                type_name.as_deref(),
                namespace.as_deref(),
                cp,
            )
        })
        .await
    }

    pub async fn find_circular_dependencies(
        &self,
        namespace_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<CircularDependency>> {
        let namespace_filter = namespace_filter.map(str::to_string);
        let max_cycle_length = self.settings.analysis.max_cycle_length;
        self.run("find_circular_dependencies", cancel, move |graph, cp| {
            CallGraphAnalyzer::new(graph).find_circular_dependencies(
                namespace_filter.as_deref(),
                max_cycle_length,
                cp,
            )
        })
        .await
    }

    pub async fn find_reachable_methods(
        &self,
        query: MethodQuery,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<ReachableMethodsResult>> {
        let depth = self.depth(max_depth)?;
        self.run("find_reachable_methods", cancel, move |graph, cp| {
            CallGraphAnalyzer::new(graph).find_reachable_methods(&query, depth, cp)
        })
        .await
    }

    pub async fn find_shortest_path(
        &self,
        from: MethodQuery,
        to: MethodQuery,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<CallChainPath>> {
        self.run("find_shortest_path", cancel, move |graph, cp| {
            CallGraphAnalyzer::new(graph).find_shortest_path(&from, &to, cp)
        })
        .await
    }

    // Types

    pub async fn find_type_usages(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let type_name = require_type_name(type_name)?;
        self.run("find_type_usages", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).find_type_usages(&type_name, cp)
        })
        .await
    }

    pub async fn find_type_usages_by_full_name(
        &self,
        qualified_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let qualified_name = require_type_name(qualified_name)?;
        self.run("find_type_usages_by_full_name", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).find_type_usages_by_full_name(&qualified_name, cp)
        })
        .await
    }

    pub async fn find_instantiations(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let type_name = require_type_name(type_name)?;
        self.run("find_instantiations", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).find_instantiations(&type_name, cp)
        })
        .await
    }

    pub async fn find_interface_implementations(
        &self,
        interface_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let interface_name = require_type_name(interface_name)?;
        self.run("find_interface_implementations", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).find_interface_implementations(&interface_name, cp)
        })
        .await
    }

    pub async fn find_generic_usages(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let type_name = require_type_name(type_name)?;
        self.run("find_generic_usages", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).find_generic_usages(&type_name, cp)
        })
        .await
    }

    pub async fn analyze_inheritance(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<InheritanceAnalysis>> {
        let type_name = require_type_name(type_name)?;
        self.run("analyze_inheritance", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).analyze_inheritance(&type_name, cp)
        })
        .await
    }

    pub async fn analyze_type_dependencies(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeDependencyAnalysis>> {
        let type_name = require_type_name(type_name)?;
        let max_cycle_length = self.settings.analysis.max_cycle_length;
        self.run("analyze_type_dependencies", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph).analyze_type_dependencies(
                &type_name,
                max_cycle_length,
                cp,
            )
        })
        .await
    }

    pub async fn find_refactoring_opportunities(
        &self,
        namespace_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> QueryResult<TypeRefactoringOpportunities> {
        let namespace_filter = namespace_filter.map(str::to_string);
        self.run("find_refactoring_opportunities", cancel, move |graph, cp| {
            TypeUsageAnalyzer::new(graph)
                .find_refactoring_opportunities(namespace_filter.as_deref(), cp)
        })
        .await
    }

    // Comprehensive

    pub async fn analyze_method(
        &self,
        query: MethodQuery,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<MethodAnalysis>> {
        let depth = self.depth(max_depth)?;
        self.run("analyze_method", cancel, move |graph, cp| {
            ComprehensiveAnalyzer::new(graph).analyze_method(&query, depth, cp)
        })
        .await
    }

    pub async fn analyze_type(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Option<TypeAnalysis>> {
        let type_name = require_type_name(type_name)?;
        let max_cycle_length = self.settings.analysis.max_cycle_length;
        self.run("analyze_type", cancel, move |graph, cp| {
            ComprehensiveAnalyzer::new(graph).analyze_type(&type_name, max_cycle_length, cp)
        })
        .await
    }

    /// Requested depth, or the configured default, bounded by the limit.
    fn depth(&self, requested: Option<usize>) -> QueryResult<usize> {
        let analysis = &self.settings.analysis;
        let depth = requested.unwrap_or(analysis.default_max_depth);
        if depth > analysis.max_depth_limit {
            return Err(QueryError::invalid(
                "max_depth",
                format!("{depth} exceeds the limit of {}", analysis.max_depth_limit),
            ));
        }
        Ok(depth)
    }

    /// Run `query` against the current snapshot on the blocking pool.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        query: F,
    ) -> QueryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ReferenceGraph, Checkpoint<'_>) -> QueryResult<T> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled { operation });
        }
        debug_event!("service", "query", "{operation}");

        let graph = self.store.snapshot();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || query(&*graph, Checkpoint::new(&token, operation)))
            .await
            .map_err(|e| QueryError::TaskFailed(format!("{operation}: {e}")))?
    }
}

fn require_type_name(type_name: &str) -> QueryResult<String> {
    let trimmed = type_name.trim();
    if trimmed.is_empty() {
        return Err(QueryError::invalid("type_name", "must not be empty"));
    }
    Ok(trimmed.to_string())
}
