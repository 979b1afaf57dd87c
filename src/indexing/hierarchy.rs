use crate::symbol::{Symbol, SymbolCatalog};
use crate::types::{SymbolId, SymbolKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;

/// Resolved inheritance and implementation links between catalog types.
///
/// Supertype names that do not resolve to a unique catalog type (framework
/// types, ambiguous simple names) are left out of the link tables; callers that
/// need them read the raw names from the type's `TypeShape`.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    /// derived type -> resolved base class
    base_of: HashMap<SymbolId, SymbolId>,
    /// type -> interfaces it lists directly
    interfaces_of: HashMap<SymbolId, Vec<SymbolId>>,
    /// base class -> types deriving from it directly
    derived: HashMap<SymbolId, Vec<SymbolId>>,
    /// interface -> types listing it directly
    implementers: HashMap<SymbolId, Vec<SymbolId>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(catalog: &SymbolCatalog) -> Self {
        let mut hierarchy = Self::new();

        for symbol in catalog.types() {
            let Some(shape) = symbol.type_shape() else {
                continue;
            };

            if let Some(base) = shape
                .base_type
                .as_deref()
                .and_then(|name| catalog.resolve_type_reference(name))
                .filter(|&base| base != symbol.id)
            {
                hierarchy.add_base(symbol.id, base);
            }

            for interface in shape
                .interfaces
                .iter()
                .filter_map(|name| catalog.resolve_type_reference(name))
                .filter(|&interface| interface != symbol.id)
            {
                hierarchy.add_interface(symbol.id, interface);
            }
        }

        hierarchy
    }

    pub fn add_base(&mut self, derived: SymbolId, base: SymbolId) {
        self.base_of.insert(derived, base);
        self.derived.entry(base).or_default().push(derived);
    }

    pub fn add_interface(&mut self, type_id: SymbolId, interface: SymbolId) {
        let listed = self.interfaces_of.entry(type_id).or_default();
        if listed.contains(&interface) {
            return;
        }
        listed.push(interface);
        self.implementers.entry(interface).or_default().push(type_id);
    }

    pub fn base_of(&self, type_id: SymbolId) -> Option<SymbolId> {
        self.base_of.get(&type_id).copied()
    }

    pub fn interfaces_of(&self, type_id: SymbolId) -> &[SymbolId] {
        self.interfaces_of
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn derived_of(&self, type_id: SymbolId) -> &[SymbolId] {
        self.derived
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn implementers_of(&self, interface: SymbolId) -> &[SymbolId] {
        self.implementers
            .get(&interface)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Base classes, nearest first. Stops on a malformed cyclic chain.
    pub fn ancestors(&self, type_id: SymbolId) -> Vec<SymbolId> {
        let Ok(chain) = self.ancestors_with(type_id, |_| Ok::<_, Infallible>(()));
        chain
    }

    /// [`Self::ancestors`], calling `visit` on each type before following its
    /// base link.
    pub fn ancestors_with<E>(
        &self,
        type_id: SymbolId,
        mut visit: impl FnMut(SymbolId) -> Result<(), E>,
    ) -> Result<Vec<SymbolId>, E> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([type_id]);
        let mut current = type_id;

        loop {
            visit(current)?;
            let Some(base) = self.base_of(current) else {
                break;
            };
            if !seen.insert(base) {
                break;
            }
            chain.push(base);
            current = base;
        }

        Ok(chain)
    }

    /// Every type that derives from or implements `type_id`, breadth first.
    pub fn descendants(&self, type_id: SymbolId) -> Vec<SymbolId> {
        let Ok(found) = self.descendants_with(type_id, |_| Ok::<_, Infallible>(()));
        found
    }

    /// [`Self::descendants`], calling `visit` on each type before expanding it.
    pub fn descendants_with<E>(
        &self,
        type_id: SymbolId,
        mut visit: impl FnMut(SymbolId) -> Result<(), E>,
    ) -> Result<Vec<SymbolId>, E> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([type_id]);
        let mut queue = VecDeque::from([type_id]);

        while let Some(current) = queue.pop_front() {
            visit(current)?;
            let direct = self
                .derived_of(current)
                .iter()
                .chain(self.implementers_of(current));
            for &next in direct {
                if seen.insert(next) {
                    found.push(next);
                    queue.push_back(next);
                }
            }
        }

        Ok(found)
    }

    /// Interfaces reachable through the type itself, its bases, and interface
    /// inheritance.
    pub fn all_interfaces(&self, type_id: SymbolId) -> Vec<SymbolId> {
        let Ok(found) = self.all_interfaces_with(type_id, |_| Ok::<_, Infallible>(()));
        found
    }

    /// [`Self::all_interfaces`], calling `visit` on every type and interface
    /// it expands.
    pub fn all_interfaces_with<E>(
        &self,
        type_id: SymbolId,
        mut visit: impl FnMut(SymbolId) -> Result<(), E>,
    ) -> Result<Vec<SymbolId>, E> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<SymbolId> = std::iter::once(type_id)
            .chain(self.ancestors_with(type_id, &mut visit)?)
            .flat_map(|ty| self.interfaces_of(ty).iter().copied())
            .collect();

        while let Some(interface) = queue.pop_front() {
            if interface == type_id || !seen.insert(interface) {
                continue;
            }
            visit(interface)?;
            found.push(interface);
            queue.extend(self.interfaces_of(interface).iter().copied());
        }

        Ok(found)
    }

    /// Calls through this type go through virtual dispatch.
    pub fn is_dispatch_boundary(symbol: &Symbol) -> bool {
        symbol.kind == SymbolKind::Interface
            || symbol.type_shape().is_some_and(|shape| shape.is_abstract)
    }

    /// Methods in types below `dispatch_type` that share the member shape of
    /// `method`, in discovery order.
    pub fn overriding_methods(
        &self,
        catalog: &SymbolCatalog,
        method: SymbolId,
        dispatch_type: SymbolId,
    ) -> Vec<SymbolId> {
        let Some(signature) = catalog.signature(method) else {
            return Vec::new();
        };

        self.descendants(dispatch_type)
            .into_iter()
            .filter_map(|ty| catalog.get(ty))
            .flat_map(|ty| catalog.methods_of(&ty.qualified_name))
            .filter(|candidate| candidate.id != method)
            .filter(|candidate| {
                candidate
                    .signature()
                    .is_some_and(|sig| sig.overrides_shape_of(signature))
            })
            .map(|candidate| candidate.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{MethodSignature, SymbolDetail, TypeShape};
    use crate::types::{Accessibility, Range};

    fn add_type(catalog: &mut SymbolCatalog, name: &str, kind: SymbolKind, shape: TypeShape) -> SymbolId {
        catalog
            .insert(
                kind,
                name,
                "src/types.cs",
                Range::default(),
                Accessibility::Public,
                SymbolDetail::Type(shape),
            )
            .unwrap()
    }

    fn add_method(catalog: &mut SymbolCatalog, ty: &str, name: &str) -> SymbolId {
        let sig = MethodSignature::from_types(ty, name, "void", &[]).unwrap();
        catalog
            .insert(
                SymbolKind::Method,
                &sig.display_name(),
                "src/types.cs",
                Range::default(),
                Accessibility::Public,
                SymbolDetail::Method(sig),
            )
            .unwrap()
    }

    fn derived_from(base: Option<&str>, interfaces: &[&str]) -> TypeShape {
        TypeShape {
            base_type: base.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            ..TypeShape::default()
        }
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut catalog = SymbolCatalog::new();
        let root = add_type(&mut catalog, "App.Root", SymbolKind::Class, TypeShape::default());
        let mid = add_type(&mut catalog, "App.Mid", SymbolKind::Class, derived_from(Some("App.Root"), &[]));
        let leaf = add_type(&mut catalog, "App.Leaf", SymbolKind::Class, derived_from(Some("Mid"), &[]));
        let hierarchy = TypeHierarchy::build(&catalog);

        assert_eq!(hierarchy.ancestors(leaf), vec![mid, root]);
        assert_eq!(hierarchy.descendants(root), vec![mid, leaf]);
        assert!(hierarchy.ancestors(root).is_empty());
    }

    #[test]
    fn test_visit_stops_walk() {
        let mut catalog = SymbolCatalog::new();
        let root = add_type(&mut catalog, "App.Root", SymbolKind::Class, TypeShape::default());
        let mid = add_type(&mut catalog, "App.Mid", SymbolKind::Class, derived_from(Some("App.Root"), &[]));
        let leaf = add_type(&mut catalog, "App.Leaf", SymbolKind::Class, derived_from(Some("Mid"), &[]));
        let hierarchy = TypeHierarchy::build(&catalog);

        let mut expanded = Vec::new();
        let result = hierarchy.descendants_with(root, |ty| {
            expanded.push(ty);
            if ty == mid { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(expanded, vec![root, mid]);

        let result = hierarchy.ancestors_with(leaf, |ty| if ty == mid { Err("stop") } else { Ok(()) });
        assert_eq!(result, Err("stop"));
    }

    #[test]
    fn test_unresolved_base_is_ignored() {
        let mut catalog = SymbolCatalog::new();
        let ty = add_type(
            &mut catalog,
            "App.Failure",
            SymbolKind::Class,
            derived_from(Some("System.Exception"), &[]),
        );
        let hierarchy = TypeHierarchy::build(&catalog);

        assert_eq!(hierarchy.base_of(ty), None);
    }

    #[test]
    fn test_all_interfaces_follows_bases_and_interface_inheritance() {
        let mut catalog = SymbolCatalog::new();
        let ibase = add_type(&mut catalog, "App.IBase", SymbolKind::Interface, TypeShape::default());
        let iext = add_type(&mut catalog, "App.IExt", SymbolKind::Interface, derived_from(None, &["IBase"]));
        add_type(&mut catalog, "App.Base", SymbolKind::Class, derived_from(None, &["IExt"]));
        let derived = add_type(&mut catalog, "App.Derived", SymbolKind::Class, derived_from(Some("Base"), &[]));
        let hierarchy = TypeHierarchy::build(&catalog);

        assert_eq!(hierarchy.all_interfaces(derived), vec![iext, ibase]);
    }

    #[test]
    fn test_overriding_methods_across_implementers() {
        let mut catalog = SymbolCatalog::new();
        let iservice = add_type(&mut catalog, "App.IService", SymbolKind::Interface, TypeShape::default());
        add_type(&mut catalog, "App.ServiceImpl", SymbolKind::Class, derived_from(None, &["IService"]));
        add_type(&mut catalog, "App.OtherImpl", SymbolKind::Class, derived_from(None, &["IService"]));
        let execute = add_method(&mut catalog, "App.IService", "Execute");
        let impl_execute = add_method(&mut catalog, "App.ServiceImpl", "Execute");
        let other_execute = add_method(&mut catalog, "App.OtherImpl", "Execute");
        add_method(&mut catalog, "App.OtherImpl", "Helper");
        let hierarchy = TypeHierarchy::build(&catalog);

        assert_eq!(
            hierarchy.overriding_methods(&catalog, execute, iservice),
            vec![impl_execute, other_execute]
        );
        assert!(TypeHierarchy::is_dispatch_boundary(catalog.get(iservice).unwrap()));
    }
}
