//! Turns front-end facts into a [`ReferenceGraph`].
//!
//! Construction runs in three passes over the fact store: declarations fill
//! the catalog, the catalog yields the type hierarchy, and usage sites are
//! then resolved and classified into typed edges.

use crate::indexing::facts::{SymbolDeclaration, SyntacticForm, UsageSite};
use crate::indexing::TypeHierarchy;
use crate::relationship::{
    CallEdge, CallKind, Confidence, SourceLocation, TypeUsageEdge, TypeUsageKind,
};
use crate::storage::{IndexData, ReferenceGraph};
use crate::symbol::{SymbolCatalog, SymbolDetail};
use crate::types::SymbolId;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub symbols: usize,
    pub call_edges: usize,
    pub direct_call_edges: usize,
    pub type_usages: usize,
    pub skipped_declarations: usize,
    pub unresolved_usages: usize,
}

pub struct GraphBuilder<'a> {
    data: &'a IndexData,
    stats: BuildStats,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(data: &'a IndexData) -> Self {
        Self {
            data,
            stats: BuildStats::default(),
        }
    }

    pub fn build(mut self) -> (ReferenceGraph, BuildStats) {
        let catalog = self.build_catalog();
        let hierarchy = TypeHierarchy::build(&catalog);
        let mut graph = ReferenceGraph::new(catalog, hierarchy, self.data.file_count());

        self.add_declaration_usages(&mut graph);
        for facts in self.data.files.values() {
            for usage in &facts.usages {
                if !self.add_usage(&mut graph, usage) {
                    self.stats.unresolved_usages += 1;
                }
            }
        }

        self.stats.symbols = graph.catalog().len();
        self.stats.call_edges = graph.call_edge_count();
        self.stats.direct_call_edges = graph.direct_edge_count();
        self.stats.type_usages = graph.type_usage_count();
        (graph, self.stats)
    }

    fn build_catalog(&mut self) -> SymbolCatalog {
        let mut catalog = SymbolCatalog::new();

        for facts in self.data.files.values() {
            for decl in &facts.declarations {
                let Some(detail) = declaration_detail(decl) else {
                    warn!(
                        "[builder] '{}' has no detail matching its kind {:?}",
                        decl.qualified_name, decl.kind
                    );
                    self.stats.skipped_declarations += 1;
                    continue;
                };

                if let Err(e) = catalog.insert(
                    decl.kind,
                    &decl.qualified_name,
                    &decl.file_path,
                    decl.range,
                    decl.accessibility,
                    detail,
                ) {
                    warn!("[builder] skipping declaration in {}: {e}", decl.file_path);
                    self.stats.skipped_declarations += 1;
                }
            }
        }

        catalog
    }

    /// TypeDeclaration, BaseClass and InterfaceImplementation edges.
    fn add_declaration_usages(&self, graph: &mut ReferenceGraph) {
        let mut pending = Vec::new();

        for ty in graph.catalog().types() {
            let location = SourceLocation::new(
                &ty.file_path,
                ty.range.start_line,
                ty.range.start_column,
            );
            pending.push(TypeUsageEdge::new(
                None,
                ty.id,
                TypeUsageKind::TypeDeclaration,
                location.clone(),
            ));

            let Some(shape) = ty.type_shape() else {
                continue;
            };
            if let Some(base) = graph.hierarchy().base_of(ty.id) {
                pending.push(
                    TypeUsageEdge::new(Some(ty.id), base, TypeUsageKind::BaseClass, location.clone())
                        .with_context(shape.base_type.as_deref()),
                );
            }
            for &interface in graph.hierarchy().interfaces_of(ty.id) {
                let listed = graph.symbol(interface).map(|s| s.qualified_name.as_ref());
                pending.push(
                    TypeUsageEdge::new(
                        Some(ty.id),
                        interface,
                        TypeUsageKind::InterfaceImplementation,
                        location.clone(),
                    )
                    .with_context(listed),
                );
            }
        }

        for usage in pending {
            graph.add_type_usage(usage);
        }
    }

    fn add_usage(&self, graph: &mut ReferenceGraph, usage: &UsageSite) -> bool {
        let from = match usage.from_symbol.as_deref() {
            Some(key) => match resolve_user(graph.catalog(), key) {
                Some(id) => Some(id),
                None => {
                    debug!(
                        "[builder] unresolved enclosing symbol '{key}' at {}:{}",
                        usage.file_path, usage.line
                    );
                    return false;
                }
            },
            None => None,
        };
        let location = SourceLocation::new(&usage.file_path, usage.line, usage.column);

        let Some(kind) = usage_kind(usage.form) else {
            return self.add_invocation(graph, usage, from, location);
        };

        let Some(used_type) = graph.catalog().resolve_type_reference(&usage.target) else {
            debug!(
                "[builder] unresolved type '{}' at {}:{}",
                usage.target, usage.file_path, usage.line
            );
            return false;
        };

        let edge = TypeUsageEdge::new(from, used_type, kind, location)
            .with_context(usage.snippet.as_deref())
            .with_generic_arguments(usage.generic_arguments.clone());
        graph.add_type_usage(edge);
        true
    }

    fn add_invocation(
        &self,
        graph: &mut ReferenceGraph,
        usage: &UsageSite,
        caller: Option<SymbolId>,
        location: SourceLocation,
    ) -> bool {
        let Some(caller) = caller.filter(|&id| graph.catalog().signature(id).is_some()) else {
            debug!(
                "[builder] invocation of '{}' at {}:{} has no calling method",
                usage.target, usage.file_path, usage.line
            );
            return false;
        };
        let Some(target) = graph.catalog().resolve_method_key(&usage.target) else {
            debug!(
                "[builder] unresolved call target '{}' at {}:{}",
                usage.target, usage.file_path, usage.line
            );
            return false;
        };

        let edges = classify(graph, target, usage.receiver_type.as_deref());
        for (callee, kind, confidence) in edges {
            let edge = CallEdge::new(caller, callee, kind, confidence, location.clone())
                .with_snippet(usage.snippet.as_deref());
            graph.add_call_edge(edge);
        }
        true
    }
}

/// Decide how a call to `target` reaches its implementations.
///
/// Calls through an interface or abstract type produce an Indirect/Medium edge
/// to the declared member plus one Indirect edge per override below the
/// dispatch type (Medium when there is exactly one, Low otherwise). Anything
/// else is a single Direct/High edge.
pub fn classify(
    graph: &ReferenceGraph,
    target: SymbolId,
    receiver_type: Option<&str>,
) -> Vec<(SymbolId, CallKind, Confidence)> {
    let catalog = graph.catalog();
    let dispatch_type = receiver_type
        .and_then(|name| catalog.resolve_type_reference(name))
        .or_else(|| graph.owning_type(target));

    let Some(dispatch_type) = dispatch_type.filter(|&ty| {
        catalog
            .get(ty)
            .is_some_and(TypeHierarchy::is_dispatch_boundary)
    }) else {
        return vec![(target, CallKind::Direct, Confidence::High)];
    };

    let overrides = graph
        .hierarchy()
        .overriding_methods(catalog, target, dispatch_type);
    let override_confidence = if overrides.len() == 1 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    std::iter::once((target, CallKind::Indirect, Confidence::Medium))
        .chain(
            overrides
                .into_iter()
                .map(|id| (id, CallKind::Indirect, override_confidence)),
        )
        .collect()
}

fn declaration_detail(decl: &SymbolDeclaration) -> Option<SymbolDetail> {
    if decl.kind.is_callable() {
        decl.signature.clone().map(SymbolDetail::Method)
    } else if decl.signature.is_none() {
        Some(SymbolDetail::Type(decl.type_shape.clone().unwrap_or_default()))
    } else {
        None
    }
}

/// The enclosing symbol of a usage is a method key or a type name.
fn resolve_user(catalog: &SymbolCatalog, key: &str) -> Option<SymbolId> {
    catalog
        .resolve_method_key(key)
        .or_else(|| catalog.resolve_type_reference(key))
}

/// Type usage recorded for a syntactic form; invocations become call edges.
fn usage_kind(form: SyntacticForm) -> Option<TypeUsageKind> {
    let kind = match form {
        SyntacticForm::Invocation => return None,
        SyntacticForm::ObjectCreation => TypeUsageKind::Instantiation,
        SyntacticForm::ParameterType => TypeUsageKind::Parameter,
        SyntacticForm::ReturnType => TypeUsageKind::ReturnType,
        SyntacticForm::FieldType => TypeUsageKind::Field,
        SyntacticForm::PropertyType => TypeUsageKind::Property,
        SyntacticForm::GenericArgument => TypeUsageKind::GenericArgument,
    };
    Some(kind)
}
