//! Typed edges of the reference graph.

use crate::types::{CompactString, SymbolId, compact_string};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a call reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// The call site's static target is exactly the declared method.
    Direct,
    /// The target is reached through an interface or abstract dispatch boundary.
    Indirect,
}

/// Certainty that a recorded edge is taken at runtime.
///
/// Ordered from weakest to strongest so `min()` yields the weakest link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeUsageKind {
    TypeDeclaration,
    Instantiation,
    Parameter,
    ReturnType,
    Field,
    Property,
    GenericArgument,
    BaseClass,
    InterfaceImplementation,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Direct => write!(f, "Direct"),
            CallKind::Indirect => write!(f, "Indirect"),
        }
    }
}

impl TypeUsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeDeclaration => "TypeDeclaration",
            Self::Instantiation => "Instantiation",
            Self::Parameter => "Parameter",
            Self::ReturnType => "ReturnType",
            Self::Field => "Field",
            Self::Property => "Property",
            Self::GenericArgument => "GenericArgument",
            Self::BaseClass => "BaseClass",
            Self::InterfaceImplementation => "InterfaceImplementation",
        }
    }

    /// Usages that make one type depend on another.
    pub fn is_dependency(&self) -> bool {
        !matches!(self, Self::TypeDeclaration)
    }
}

/// Where in the source an edge was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file_path: CompactString,
    pub line: u32,
    pub column: u16,
}

impl SourceLocation {
    pub fn new(file_path: &str, line: u32, column: u16) -> Self {
        Self {
            file_path: compact_string(file_path),
            line,
            column,
        }
    }
}

/// caller -> callee, classified once when recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: SymbolId,
    pub callee: SymbolId,
    pub kind: CallKind,
    pub confidence: Confidence,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<CompactString>,
}

impl CallEdge {
    pub fn new(
        caller: SymbolId,
        callee: SymbolId,
        kind: CallKind,
        confidence: Confidence,
        location: SourceLocation,
    ) -> Self {
        Self {
            caller,
            callee,
            kind,
            confidence,
            location,
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: Option<&str>) -> Self {
        self.snippet = snippet.map(compact_string);
        self
    }

    /// Two edges at the same call site between the same methods are one edge.
    pub fn same_site(&self, other: &CallEdge) -> bool {
        self.caller == other.caller && self.callee == other.callee && self.location == other.location
    }

    pub fn is_direct(&self) -> bool {
        self.kind == CallKind::Direct
    }
}

/// A use of a type at some location, optionally attributed to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeUsageEdge {
    pub using_symbol: Option<SymbolId>,
    pub used_type: SymbolId,
    pub kind: TypeUsageKind,
    pub confidence: Confidence,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generic_arguments: Option<Vec<String>>,
}

impl TypeUsageEdge {
    pub fn new(
        using_symbol: Option<SymbolId>,
        used_type: SymbolId,
        kind: TypeUsageKind,
        location: SourceLocation,
    ) -> Self {
        Self {
            using_symbol,
            used_type,
            kind,
            confidence: Confidence::High,
            location,
            context: None,
            generic_arguments: None,
        }
    }

    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(compact_string);
        self
    }

    /// Generic arguments are only kept for `GenericArgument` usages.
    pub fn with_generic_arguments(mut self, arguments: Vec<String>) -> Self {
        if self.kind == TypeUsageKind::GenericArgument && !arguments.is_empty() {
            self.generic_arguments = Some(arguments);
        }
        self
    }

    pub fn generic_arguments(&self) -> Option<&[String]> {
        self.generic_arguments.as_deref()
    }
}
