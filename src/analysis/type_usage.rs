//! Type usage, inheritance and type-level dependency analysis.

use crate::analysis::cycles::{self, Adjacency};
use crate::analysis::{
    Checkpoint, InheritanceAnalysis, TypeDependency, TypeDependencyAnalysis,
    TypeRefactoringOpportunities, TypeUsage, TypeUsageResult,
};
use crate::error::QueryResult;
use crate::relationship::{TypeUsageEdge, TypeUsageKind};
use crate::storage::ReferenceGraph;
use crate::types::{SymbolId, SymbolKind, namespace_matches};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};

/// Types declaring more members than this are reported as oversized.
pub const OVERSIZED_TYPE_MEMBERS: usize = 20;

pub struct TypeUsageAnalyzer<'g> {
    graph: &'g ReferenceGraph,
}

impl<'g> TypeUsageAnalyzer<'g> {
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Usages of every type matching `type_name` (simple, suffix or full name).
    pub fn find_type_usages(
        &self,
        type_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let types = self.graph.catalog().resolve_types(type_name);
        self.usage_result(type_name, &types, None, checkpoint)
    }

    pub fn find_type_usages_by_full_name(
        &self,
        qualified_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let types: Vec<SymbolId> = self
            .graph
            .catalog()
            .by_qualified_name(qualified_name)
            .filter(|s| s.is_type())
            .map(|s| s.id)
            .into_iter()
            .collect();
        self.usage_result(qualified_name, &types, None, checkpoint)
    }

    pub fn find_instantiations(
        &self,
        type_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let types = self.graph.catalog().resolve_types(type_name);
        self.usage_result(type_name, &types, Some(TypeUsageKind::Instantiation), checkpoint)
    }

    pub fn find_interface_implementations(
        &self,
        interface_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let types = self.graph.catalog().resolve_types(interface_name);
        self.usage_result(
            interface_name,
            &types,
            Some(TypeUsageKind::InterfaceImplementation),
            checkpoint,
        )
    }

    pub fn find_generic_usages(
        &self,
        type_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        let types = self.graph.catalog().resolve_types(type_name);
        self.usage_result(type_name, &types, Some(TypeUsageKind::GenericArgument), checkpoint)
    }

    fn usage_result(
        &self,
        query: &str,
        types: &[SymbolId],
        kind: Option<TypeUsageKind>,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeUsageResult>> {
        if types.is_empty() {
            return Ok(None);
        }

        let mut usages = Vec::new();
        for &ty in types {
            checkpoint.check()?;
            usages.extend(
                self.graph
                    .usages_of_type(ty)
                    .filter(|u| kind.is_none_or(|k| u.kind == k))
                    .filter_map(|u| self.type_usage(u)),
            );
        }

        let mut usages_by_kind = IndexMap::new();
        let mut usages_by_file = IndexMap::new();
        for usage in &usages {
            *usages_by_kind.entry(usage.usage_kind).or_insert(0) += 1;
            *usages_by_file.entry(usage.file_path.clone()).or_insert(0) += 1;
        }

        Ok(Some(TypeUsageResult {
            target_type: query.to_string(),
            matched_types: self.names(types),
            total_usages: usages.len(),
            usages,
            usages_by_kind,
            usages_by_file,
        }))
    }

    fn type_usage(&self, edge: &TypeUsageEdge) -> Option<TypeUsage> {
        let used = self.graph.symbol(edge.used_type)?;
        let using = edge.using_symbol.and_then(|id| self.graph.symbol(id));
        Some(TypeUsage {
            used_type: used.qualified_name.to_string(),
            using_symbol: using.map(|s| s.qualified_name.to_string()),
            using_type: using.map(|s| s.owning_type().to_string()),
            usage_kind: edge.kind,
            file_path: edge.location.file_path.to_string(),
            line: edge.location.line,
            column: edge.location.column,
            confidence: edge.confidence,
            context: edge.context.as_deref().map(str::to_string),
            generic_arguments: edge.generic_arguments().map(<[String]>::to_vec),
        })
    }

    /// Inheritance picture of the first type matching `type_name`.
    pub fn analyze_inheritance(
        &self,
        type_name: &str,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<InheritanceAnalysis>> {
        let Some(&id) = self.graph.catalog().resolve_types(type_name).first() else {
            return Ok(None);
        };
        let Some(symbol) = self.graph.symbol(id) else {
            return Ok(None);
        };
        let shape = symbol.type_shape().cloned().unwrap_or_default();
        let hierarchy = self.graph.hierarchy();
        let visit = |_: SymbolId| checkpoint.check();

        let ancestors = hierarchy.ancestors_with(id, visit)?;
        let mut base_classes = self.names(&ancestors);
        // A framework base outside the index ends the chain by name.
        let outermost = ancestors.last().copied().unwrap_or(id);
        if let Some(external) = self
            .graph
            .symbol(outermost)
            .and_then(|s| s.type_shape())
            .and_then(|s| s.base_type.as_deref())
            .filter(|_| hierarchy.base_of(outermost).is_none())
        {
            base_classes.push(external.to_string());
        }

        let is_interface = symbol.kind == SymbolKind::Interface;
        let mut implemented_interfaces = self.names(&hierarchy.all_interfaces_with(id, visit)?);
        for listed in &shape.interfaces {
            if self.graph.catalog().resolve_type_reference(listed).is_none()
                && !implemented_interfaces.contains(listed)
            {
                implemented_interfaces.push(listed.clone());
            }
        }

        let implementing: Vec<SymbolId> = hierarchy
            .descendants_with(id, visit)?
            .into_iter()
            .filter(|&d| self.is_kind(d, |k| k != SymbolKind::Interface))
            .collect();
        let derived_classes = self.names(
            &implementing
                .iter()
                .copied()
                .filter(|&d| !is_interface || self.derives_from_class(d))
                .collect::<Vec<_>>(),
        );
        let interface_implementations = if is_interface {
            self.names(&implementing)
        } else {
            Vec::new()
        };

        let mut inheritance_chain: Vec<String> = base_classes.iter().rev().cloned().collect();
        inheritance_chain.push(symbol.qualified_name.to_string());

        Ok(Some(InheritanceAnalysis {
            target_type: symbol.qualified_name.to_string(),
            inheritance_depth: inheritance_chain.len() - 1,
            base_classes,
            derived_classes,
            implemented_interfaces,
            interface_implementations,
            inheritance_chain,
            is_abstract: shape.is_abstract || is_interface,
            is_interface,
            is_sealed: shape.is_sealed,
        }))
    }

    /// For an interface target, derived classes are only those deriving
    /// from an implementing class, not the direct implementers.
    fn derives_from_class(&self, id: SymbolId) -> bool {
        self.graph
            .hierarchy()
            .base_of(id)
            .is_some_and(|base| self.is_kind(base, |k| k != SymbolKind::Interface))
    }

    fn is_kind(&self, id: SymbolId, accept: impl Fn(SymbolKind) -> bool) -> bool {
        self.graph.symbol(id).is_some_and(|s| accept(s.kind))
    }

    /// Outgoing and incoming type dependencies of the first type matching
    /// `type_name`, plus the type cycles passing through it.
    pub fn analyze_type_dependencies(
        &self,
        type_name: &str,
        max_cycle_length: usize,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<Option<TypeDependencyAnalysis>> {
        let Some(&target) = self.graph.catalog().resolve_types(type_name).first() else {
            return Ok(None);
        };
        let Some(symbol) = self.graph.symbol(target) else {
            return Ok(None);
        };

        let mut outgoing: IndexMap<SymbolId, TypeDependency> = IndexMap::new();
        let mut incoming: IndexMap<SymbolId, TypeDependency> = IndexMap::new();
        for (from, edge) in self.dependency_edges() {
            checkpoint.check()?;
            if from == target {
                self.record(&mut outgoing, edge.used_type, from, edge);
            } else if edge.used_type == target {
                self.record(&mut incoming, from, from, edge);
            }
        }

        let dependency_frequency = outgoing
            .values()
            .map(|d| (d.to_type.clone(), d.usage_count))
            .collect();

        let adjacency = self.dependency_graph();
        let circular_dependencies: Vec<Vec<String>> =
            cycles::cycles_through(&adjacency, target, max_cycle_length, checkpoint)?
                .iter()
                .map(|cycle| self.names(cycle))
                .collect();

        Ok(Some(TypeDependencyAnalysis {
            target_type: symbol.qualified_name.to_string(),
            outgoing_dependencies: outgoing.into_values().collect(),
            incoming_dependencies: incoming.into_values().collect(),
            dependency_frequency,
            has_circular_dependencies: !circular_dependencies.is_empty(),
            circular_dependencies,
        }))
    }

    /// Aggregate per counterpart type; location and kind come from the first
    /// usage seen.
    fn record(
        &self,
        into: &mut IndexMap<SymbolId, TypeDependency>,
        key: SymbolId,
        from: SymbolId,
        edge: &TypeUsageEdge,
    ) {
        if let Some(existing) = into.get_mut(&key) {
            existing.usage_count += 1;
            return;
        }
        let (Some(from_symbol), Some(to_symbol)) =
            (self.graph.symbol(from), self.graph.symbol(edge.used_type))
        else {
            return;
        };
        into.insert(
            key,
            TypeDependency {
                from_type: from_symbol.qualified_name.to_string(),
                to_type: to_symbol.qualified_name.to_string(),
                dependency_kind: edge.kind,
                file_path: edge.location.file_path.to_string(),
                line: edge.location.line,
                column: edge.location.column,
                confidence: edge.confidence,
                usage_count: 1,
            },
        );
    }

    /// Dependency usages paired with the type that owns the using symbol.
    /// Self-references are left out.
    fn dependency_edges(&self) -> impl Iterator<Item = (SymbolId, &'g TypeUsageEdge)> + 'g {
        let graph = self.graph;
        graph
            .type_usages()
            .iter()
            .filter(|u| u.kind.is_dependency())
            .filter_map(move |u| {
                let from = graph.owning_type(u.using_symbol?)?;
                (from != u.used_type).then_some((from, u))
            })
    }

    fn dependency_graph(&self) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for (from, edge) in self.dependency_edges() {
            adjacency.add_edge(from, edge.used_type);
        }
        adjacency
    }

    /// Types worth a second look, optionally restricted to a namespace.
    pub fn find_refactoring_opportunities(
        &self,
        namespace_filter: Option<&str>,
        checkpoint: Checkpoint<'_>,
    ) -> QueryResult<TypeRefactoringOpportunities> {
        let namespace_filter = namespace_filter.map(str::trim).filter(|s| !s.is_empty());
        let catalog = self.graph.catalog();
        let in_scope: Vec<SymbolId> = catalog
            .types()
            .filter(|t| namespace_filter.is_none_or(|ns| namespace_matches(t.namespace(), ns)))
            .map(|t| t.id)
            .collect();

        let mut unused_types = Vec::new();
        let mut single_implementation_interfaces = Vec::new();
        let mut oversized_types = Vec::new();
        for &ty in &in_scope {
            checkpoint.check()?;
            let Some(symbol) = self.graph.symbol(ty) else {
                continue;
            };
            let name = symbol.qualified_name.to_string();

            if !self.graph.usages_of_type(ty).any(|u| u.kind.is_dependency()) {
                unused_types.push(name.clone());
            }
            if symbol.kind == SymbolKind::Interface {
                let implementations = self
                    .graph
                    .usages_of_type(ty)
                    .filter(|u| u.kind == TypeUsageKind::InterfaceImplementation)
                    .count();
                if implementations == 1 {
                    single_implementation_interfaces.push(name.clone());
                }
            }
            let members = symbol.type_shape().map_or(0, |s| s.members.len())
                + catalog.methods_of(&symbol.qualified_name).count();
            if members > OVERSIZED_TYPE_MEMBERS {
                oversized_types.push(name);
            }
        }

        let adjacency = self.dependency_graph();
        let scope: HashSet<SymbolId> = in_scope.iter().copied().collect();
        let mut circular_dependency_types = Vec::new();
        for component in cycles::strongly_connected_components(&adjacency, checkpoint)? {
            if component.len() > 1 {
                let mut members: Vec<SymbolId> = component
                    .into_iter()
                    .filter(|id| scope.contains(id))
                    .collect();
                members.sort();
                circular_dependency_types.extend(self.names(&members));
            }
        }

        let duplicated_shapes = self.duplicated_shapes(&in_scope);

        let mut breakdown = IndexMap::new();
        breakdown.insert("unused_types".to_string(), unused_types.len());
        breakdown.insert(
            "single_implementation_interfaces".to_string(),
            single_implementation_interfaces.len(),
        );
        breakdown.insert("oversized_types".to_string(), oversized_types.len());
        breakdown.insert(
            "circular_dependency_types".to_string(),
            circular_dependency_types.len(),
        );
        breakdown.insert("duplicated_shapes".to_string(), duplicated_shapes.len());
        let total_opportunities = breakdown.values().sum();

        Ok(TypeRefactoringOpportunities {
            unused_types,
            single_implementation_interfaces,
            oversized_types,
            circular_dependency_types,
            duplicated_shapes,
            breakdown,
            total_opportunities,
        })
    }

    /// Groups of non-interface types whose member sets are identical and
    /// non-empty.
    fn duplicated_shapes(&self, types: &[SymbolId]) -> Vec<Vec<String>> {
        let catalog = self.graph.catalog();
        let mut groups: IndexMap<BTreeSet<String>, Vec<String>> = IndexMap::new();

        for symbol in types.iter().filter_map(|&id| self.graph.symbol(id)) {
            if symbol.kind == SymbolKind::Interface {
                continue;
            }
            let mut shape: BTreeSet<String> = symbol
                .type_shape()
                .map(|s| s.members.iter().cloned().collect())
                .unwrap_or_default();
            shape.extend(
                catalog
                    .methods_of(&symbol.qualified_name)
                    .filter_map(|m| m.signature())
                    .map(|sig| sig.shape()),
            );
            if shape.is_empty() {
                continue;
            }
            groups
                .entry(shape)
                .or_default()
                .push(symbol.qualified_name.to_string());
        }

        groups
            .into_values()
            .filter(|names| names.len() > 1)
            .collect()
    }

    fn names(&self, ids: &[SymbolId]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| self.graph.symbol(id))
            .map(|s| s.qualified_name.to_string())
            .collect()
    }
}
