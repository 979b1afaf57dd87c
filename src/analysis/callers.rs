use crate::analysis::{
    CalleeInfo, CalleeResult, CallerInfo, CallerResult, Checkpoint, method_key, signatures,
};
use crate::error::QueryResult;
use crate::relationship::{CallEdge, CallKind};
use crate::storage::ReferenceGraph;
use crate::symbol::MethodQuery;
use indexmap::IndexMap;

/// Restricts caller/callee queries to one kind of edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallFilter {
    #[default]
    All,
    Direct,
    Indirect,
}

impl CallFilter {
    fn accepts(&self, edge: &CallEdge) -> bool {
        match self {
            CallFilter::All => true,
            CallFilter::Direct => edge.is_direct(),
            CallFilter::Indirect => !edge.is_direct(),
        }
    }
}

pub struct CallerResolver<'g> {
    graph: &'g ReferenceGraph,
}

impl<'g> CallerResolver<'g> {
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Every call edge into a method matching `query`. `None` when nothing
    /// matches the query.
    pub fn find_callers(
        &self,
        query: &MethodQuery,
        filter: CallFilter,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<CallerResult>> {
        query.validate()?;
        let targets = self.graph.catalog().resolve_methods(query);
        if targets.is_empty() {
            return Ok(None);
        }

        let mut callers = Vec::new();
        for &target in &targets {
            checkpoint.check()?;
            for edge in self.graph.incoming(target).filter(|e| filter.accepts(e)) {
                if let Some(info) = self.caller_info(edge) {
                    callers.push(info);
                }
            }
        }

        let direct_callers = callers
            .iter()
            .filter(|c| c.call_type == CallKind::Direct)
            .count();
        let call_frequency_by_file = frequency_by_file(callers.iter().map(|c| c.file_path.as_str()));

        Ok(Some(CallerResult {
            target: query.describe(),
            target_signatures: signatures(self.graph, &targets),
            total_callers: callers.len(),
            direct_callers,
            indirect_callers: callers.len() - direct_callers,
            call_frequency_by_file,
            callers,
        }))
    }

    /// Every call edge out of a method matching `query`.
    pub fn find_callees(
        &self,
        query: &MethodQuery,
        filter: CallFilter,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<CalleeResult>> {
        query.validate()?;
        let sources = self.graph.catalog().resolve_methods(query);
        if sources.is_empty() {
            return Ok(None);
        }

        let mut callees = Vec::new();
        for &source in &sources {
            checkpoint.check()?;
            for edge in self.graph.outgoing(source).filter(|e| filter.accepts(e)) {
                if let Some(info) = self.callee_info(edge) {
                    callees.push(info);
                }
            }
        }

        let direct_callees = callees
            .iter()
            .filter(|c| c.call_type == CallKind::Direct)
            .count();
        let call_frequency_by_file = frequency_by_file(callees.iter().map(|c| c.file_path.as_str()));

        Ok(Some(CalleeResult {
            source: query.describe(),
            source_signatures: signatures(self.graph, &sources),
            total_callees: callees.len(),
            direct_callees,
            indirect_callees: callees.len() - direct_callees,
            call_frequency_by_file,
            callees,
        }))
    }

    fn caller_info(&self, edge: &CallEdge) -> Option<CallerInfo> {
        let caller = self.graph.symbol(edge.caller)?;
        Some(CallerInfo {
            caller_method: caller.qualified_name.to_string(),
            caller_type: caller.owning_type().to_string(),
            caller_signature: caller.signature().cloned(),
            callee_method: method_key(self.graph, edge.callee)?,
            file_path: edge.location.file_path.to_string(),
            line: edge.location.line,
            column: edge.location.column,
            call_type: edge.kind,
            confidence: edge.confidence,
            snippet: edge.snippet.as_deref().map(str::to_string),
        })
    }

    fn callee_info(&self, edge: &CallEdge) -> Option<CalleeInfo> {
        let callee = self.graph.symbol(edge.callee)?;
        Some(CalleeInfo {
            callee_method: callee.qualified_name.to_string(),
            callee_type: callee.owning_type().to_string(),
            callee_signature: callee.signature().cloned(),
            caller_method: method_key(self.graph, edge.caller)?,
            file_path: edge.location.file_path.to_string(),
            line: edge.location.line,
            column: edge.location.column,
            call_type: edge.kind,
            confidence: edge.confidence,
            snippet: edge.snippet.as_deref().map(str::to_string),
        })
    }
}

fn frequency_by_file<'a>(files: impl Iterator<Item = &'a str>) -> IndexMap<String, usize> {
    let mut frequency = IndexMap::new();
    for file in files {
        *frequency.entry(file.to_string()).or_insert(0) += 1;
    }
    frequency
}
