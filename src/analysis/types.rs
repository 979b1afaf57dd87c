//! Result values returned by the analyzers.
//!
//! Every result is freshly built from a snapshot and owns its data. Methods
//! are named by their method key (`Type.Name(T1,T2)`), types by full name.

use crate::error::QueryError;
use crate::relationship::{CallKind, Confidence, TypeUsageKind};
use crate::symbol::MethodSignature;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerInfo {
    pub caller_method: String,
    pub caller_type: String,
    pub caller_signature: Option<MethodSignature>,
    pub callee_method: String,
    pub file_path: String,
    pub line: u32,
    pub column: u16,
    pub call_type: CallKind,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerResult {
    pub target: String,
    pub target_signatures: Vec<MethodSignature>,
    pub callers: Vec<CallerInfo>,
    pub total_callers: usize,
    pub direct_callers: usize,
    pub indirect_callers: usize,
    pub call_frequency_by_file: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalleeInfo {
    pub callee_method: String,
    pub callee_type: String,
    pub callee_signature: Option<MethodSignature>,
    pub caller_method: String,
    pub file_path: String,
    pub line: u32,
    pub column: u16,
    pub call_type: CallKind,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalleeResult {
    pub source: String,
    pub source_signatures: Vec<MethodSignature>,
    pub callees: Vec<CalleeInfo>,
    pub total_callees: usize,
    pub direct_callees: usize,
    pub indirect_callees: usize,
    pub call_frequency_by_file: IndexMap<String, usize>,
}

/// Walk direction for call chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow calls made by the method (callees).
    Forward,
    /// Follow calls into the method (callers).
    Backward,
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "callees" => Ok(Direction::Forward),
            "backward" | "callers" => Ok(Direction::Backward),
            other => Err(QueryError::invalid(
                "direction",
                format!("expected 'forward' or 'backward', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallChainStep {
    pub from_method: String,
    pub to_method: String,
    pub file_path: String,
    pub line: u32,
    pub column: u16,
    pub call_type: CallKind,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallChainPath {
    pub steps: Vec<CallChainStep>,
    pub is_recursive: bool,
}

impl CallChainPath {
    pub fn new(steps: Vec<CallChainStep>, is_recursive: bool) -> Self {
        Self {
            steps,
            is_recursive,
        }
    }

    pub fn length(&self) -> usize {
        self.steps.len()
    }

    pub fn start_method(&self) -> Option<&str> {
        self.steps.first().map(|s| s.from_method.as_str())
    }

    pub fn end_method(&self) -> Option<&str> {
        self.steps.last().map(|s| s.to_method.as_str())
    }

    /// Weakest step confidence; `High` for an empty path.
    pub fn confidence(&self) -> Confidence {
        self.steps
            .iter()
            .map(|s| s.confidence)
            .min()
            .unwrap_or(Confidence::High)
    }

    /// Methods visited in order, including the start.
    pub fn methods(&self) -> Vec<&str> {
        self.start_method()
            .into_iter()
            .chain(self.steps.iter().map(|s| s.to_method.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallChainResult {
    pub target: String,
    pub direction: Direction,
    pub max_depth: usize,
    pub paths: Vec<CallChainPath>,
    pub total_paths: usize,
    pub recursive_paths: usize,
    pub longest_path: usize,
    pub unique_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularDependency {
    pub methods: Vec<String>,
    pub cycle_length: usize,
    pub steps: Vec<CallChainStep>,
    pub confidence: Confidence,
    pub files_involved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallGraphResult {
    pub scope: String,
    pub call_graph: IndexMap<String, Vec<String>>,
    pub reverse_call_graph: IndexMap<String, Vec<String>>,
    pub methods: Vec<String>,
    /// In-scope methods without callers inside the subgraph.
    pub entry_points: Vec<String>,
    pub total_methods: usize,
    pub total_edges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachableMethodsResult {
    pub start_method: String,
    pub start_signatures: Vec<MethodSignature>,
    pub max_depth: usize,
    pub reachable_methods: Vec<String>,
    pub methods_by_depth: BTreeMap<usize, Vec<String>>,
    pub total_reachable: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeUsage {
    pub used_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub using_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub using_type: Option<String>,
    pub usage_kind: TypeUsageKind,
    pub file_path: String,
    pub line: u32,
    pub column: u16,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_arguments: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeUsageResult {
    pub target_type: String,
    pub matched_types: Vec<String>,
    pub usages: Vec<TypeUsage>,
    pub usages_by_kind: IndexMap<TypeUsageKind, usize>,
    pub usages_by_file: IndexMap<String, usize>,
    pub total_usages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritanceAnalysis {
    pub target_type: String,
    /// Nearest first.
    pub base_classes: Vec<String>,
    pub derived_classes: Vec<String>,
    pub implemented_interfaces: Vec<String>,
    /// Types implementing the target when it is an interface.
    pub interface_implementations: Vec<String>,
    /// Root first, ending with the target.
    pub inheritance_chain: Vec<String>,
    pub inheritance_depth: usize,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_sealed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDependency {
    pub from_type: String,
    pub to_type: String,
    pub dependency_kind: TypeUsageKind,
    pub file_path: String,
    pub line: u32,
    pub column: u16,
    pub confidence: Confidence,
    pub usage_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDependencyAnalysis {
    pub target_type: String,
    pub outgoing_dependencies: Vec<TypeDependency>,
    pub incoming_dependencies: Vec<TypeDependency>,
    pub dependency_frequency: IndexMap<String, usize>,
    pub has_circular_dependencies: bool,
    /// Type cycles through the target, each starting at the target.
    pub circular_dependencies: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRefactoringOpportunities {
    pub unused_types: Vec<String>,
    pub single_implementation_interfaces: Vec<String>,
    pub oversized_types: Vec<String>,
    pub circular_dependency_types: Vec<String>,
    pub duplicated_shapes: Vec<Vec<String>>,
    pub breakdown: IndexMap<String, usize>,
    pub total_opportunities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodAnalysis {
    pub method: String,
    pub signatures: Vec<MethodSignature>,
    pub callers: Option<CallerResult>,
    pub callees: Option<CalleeResult>,
    pub caller_chains: Option<CallChainResult>,
    pub recursive_chains: Vec<CallChainPath>,
    pub reachable: Option<ReachableMethodsResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAnalysis {
    pub type_name: String,
    pub usages: Option<TypeUsageResult>,
    pub inheritance: Option<InheritanceAnalysis>,
    pub dependencies: Option<TypeDependencyAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(from: &str, to: &str, confidence: Confidence) -> CallChainStep {
        CallChainStep {
            from_method: from.to_string(),
            to_method: to.to_string(),
            file_path: "src/a.cs".to_string(),
            line: 1,
            column: 1,
            call_type: CallKind::Direct,
            confidence,
        }
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("Forward".parse::<Direction>().unwrap(), Direction::Forward);
        assert_eq!("callers".parse::<Direction>().unwrap(), Direction::Backward);

        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput { field: "direction", .. }));
    }

    #[test]
    fn test_path_accessors() {
        let path = CallChainPath::new(
            vec![
                step("A.Run()", "B.Go()", Confidence::High),
                step("B.Go()", "C.Do()", Confidence::Low),
            ],
            false,
        );

        assert_eq!(path.length(), 2);
        assert_eq!(path.start_method(), Some("A.Run()"));
        assert_eq!(path.end_method(), Some("C.Do()"));
        assert_eq!(path.confidence(), Confidence::Low);
        assert_eq!(path.methods(), vec!["A.Run()", "B.Go()", "C.Do()"]);
    }
}
