//! Symbol catalog: method signatures, type shapes, and name lookup.
//!
//! Every method and type reported by the front end becomes a [`Symbol`] with
//! a stable [`SymbolId`]. Symbols live in an arena (`Vec<Symbol>`) so an id is
//! also an index, which keeps traversal bookkeeping cheap.

use crate::error::{IndexError, IndexResult, QueryError, QueryResult, SignatureError};
use crate::types::{
    Accessibility, CompactString, Range, SymbolId, SymbolKind, compact_string, namespace_of,
    simple_name, type_name_matches,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One formal parameter of a method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub position: usize,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            position,
        }
    }
}

/// Identity of a method.
///
/// Equality covers name, declaring type, return type and the ordered parameter
/// types. Accessibility and parameter names do not participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SignatureParts")]
pub struct MethodSignature {
    name: String,
    declaring_type: String,
    return_type: String,
    parameters: Vec<Parameter>,
    accessibility: Accessibility,
}

#[derive(Deserialize)]
struct SignatureParts {
    name: String,
    declaring_type: String,
    #[serde(default = "default_return_type")]
    return_type: String,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(default)]
    accessibility: Accessibility,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl TryFrom<SignatureParts> for MethodSignature {
    type Error = SignatureError;

    fn try_from(parts: SignatureParts) -> Result<Self, Self::Error> {
        MethodSignature::new(
            parts.name,
            parts.declaring_type,
            parts.return_type,
            parts.parameters,
        )
        .map(|sig| sig.with_accessibility(parts.accessibility))
    }
}

impl MethodSignature {
    pub fn new(
        name: impl Into<String>,
        declaring_type: impl Into<String>,
        return_type: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Result<Self, SignatureError> {
        let name = name.into();
        let declaring_type = declaring_type.into();

        if name.trim().is_empty() {
            return Err(SignatureError::EmptyName);
        }
        if declaring_type.trim().is_empty() {
            return Err(SignatureError::EmptyDeclaringType { method: name });
        }
        for (expected, param) in parameters.iter().enumerate() {
            if param.position != expected {
                return Err(SignatureError::ParameterOrdinal {
                    method: name,
                    parameter: param.name.clone(),
                    expected,
                    found: param.position,
                });
            }
        }

        Ok(Self {
            name,
            declaring_type,
            return_type: return_type.into(),
            parameters,
            accessibility: Accessibility::default(),
        })
    }

    /// Build a signature from parameter types alone, numbering them in order.
    pub fn from_types(
        declaring_type: &str,
        name: &str,
        return_type: &str,
        parameter_types: &[&str],
    ) -> Result<Self, SignatureError> {
        let parameters = parameter_types
            .iter()
            .enumerate()
            .map(|(position, ty)| Parameter::new(format!("arg{position}"), *ty, position))
            .collect();
        Self::new(name, declaring_type, return_type, parameters)
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.type_name.as_str())
    }

    /// Stable method key: `Acme.Service.Execute(int,string)`.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}({})",
            self.declaring_type,
            self.name,
            self.parameter_types().collect::<Vec<_>>().join(",")
        )
    }

    /// `Acme.Service.Execute`, without parameters.
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }

    /// Member shape independent of the declaring type: `Execute(int):void`.
    pub fn shape(&self) -> String {
        format!(
            "{}({}):{}",
            self.name,
            self.parameter_types().collect::<Vec<_>>().join(","),
            self.return_type
        )
    }

    /// Same name and parameter types, ignoring declaring and return type.
    /// Used to pair interface members with their implementations.
    pub fn overrides_shape_of(&self, other: &MethodSignature) -> bool {
        self.name == other.name && self.parameter_types().eq(other.parameter_types())
    }
}

impl PartialEq for MethodSignature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.declaring_type == other.declaring_type
            && self.return_type == other.return_type
            && self.parameter_types().eq(other.parameter_types())
    }
}

impl Eq for MethodSignature {}

impl Hash for MethodSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.declaring_type.hash(state);
        self.return_type.hash(state);
        for ty in self.parameter_types() {
            ty.hash(state);
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.return_type, self.qualified_name())
    }
}

/// Declared shape of a type: modifiers, supertypes and non-method members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeShape {
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_sealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Fields and properties as `name:Type`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum SymbolDetail {
    Method(MethodSignature),
    Type(TypeShape),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub qualified_name: CompactString,
    pub kind: SymbolKind,
    pub file_path: CompactString,
    pub range: Range,
    pub accessibility: Accessibility,
    pub detail: SymbolDetail,
}

impl Symbol {
    pub fn signature(&self) -> Option<&MethodSignature> {
        match &self.detail {
            SymbolDetail::Method(sig) => Some(sig),
            SymbolDetail::Type(_) => None,
        }
    }

    pub fn type_shape(&self) -> Option<&TypeShape> {
        match &self.detail {
            SymbolDetail::Type(shape) => Some(shape),
            SymbolDetail::Method(_) => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.detail, SymbolDetail::Method(_))
    }

    pub fn is_type(&self) -> bool {
        matches!(self.detail, SymbolDetail::Type(_))
    }

    /// Full name of the type owning this symbol (a type owns itself).
    pub fn owning_type(&self) -> &str {
        match &self.detail {
            SymbolDetail::Method(sig) => sig.declaring_type(),
            SymbolDetail::Type(_) => &self.qualified_name,
        }
    }

    pub fn namespace(&self) -> &str {
        namespace_of(self.owning_type())
    }

    /// Short label used in results: `Service.Execute` or `Acme.Service`.
    pub fn display_name(&self) -> String {
        match &self.detail {
            SymbolDetail::Method(sig) => sig.display_name(),
            SymbolDetail::Type(_) => self.qualified_name.to_string(),
        }
    }
}

/// How a query names the method(s) it is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodQuery {
    /// Every overload with this name, optionally restricted to one type.
    ByName {
        name: String,
        containing_type: Option<String>,
    },
    /// Exactly the method with this signature.
    BySignature(MethodSignature),
}

impl MethodQuery {
    pub fn by_name(name: impl Into<String>, containing_type: Option<&str>) -> Self {
        Self::ByName {
            name: name.into(),
            containing_type: containing_type.map(str::to_string),
        }
    }

    pub fn validate(&self) -> QueryResult<()> {
        match self {
            Self::ByName { name, .. } if name.trim().is_empty() => {
                Err(QueryError::invalid("method_name", "must not be empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ByName {
                name,
                containing_type: Some(ty),
            } => format!("{ty}.{name}"),
            Self::ByName { name, .. } => name.clone(),
            Self::BySignature(sig) => sig.qualified_name(),
        }
    }
}

impl From<MethodSignature> for MethodQuery {
    fn from(sig: MethodSignature) -> Self {
        Self::BySignature(sig)
    }
}

/// Arena of symbols with name indexes.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
    by_name: HashMap<CompactString, Vec<SymbolId>>,
    by_qualified: HashMap<CompactString, SymbolId>,
    methods_by_type: HashMap<CompactString, Vec<SymbolId>>,
}

impl SymbolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration. Qualified names must be unique.
    pub fn insert(
        &mut self,
        kind: SymbolKind,
        qualified_name: &str,
        file_path: &str,
        range: Range,
        accessibility: Accessibility,
        detail: SymbolDetail,
    ) -> IndexResult<SymbolId> {
        let key = match &detail {
            SymbolDetail::Method(sig) => sig.qualified_name(),
            SymbolDetail::Type(_) => qualified_name.to_string(),
        };
        if self.by_qualified.contains_key(key.as_str()) {
            return Err(IndexError::InvalidDeclaration {
                name: key,
                reason: "declared more than once".to_string(),
            });
        }
        let id = SymbolId::new(self.symbols.len() as u32 + 1).ok_or_else(|| {
            IndexError::InvalidDeclaration {
                name: key.clone(),
                reason: "symbol arena exhausted".to_string(),
            }
        })?;

        let name = match &detail {
            SymbolDetail::Method(sig) => compact_string(sig.name()),
            SymbolDetail::Type(_) => compact_string(simple_name(qualified_name)),
        };
        if let SymbolDetail::Method(sig) = &detail {
            self.methods_by_type
                .entry(compact_string(sig.declaring_type()))
                .or_default()
                .push(id);
        }
        self.by_name.entry(name.clone()).or_default().push(id);
        self.by_qualified.insert(compact_string(&key), id);
        self.symbols.push(Symbol {
            id,
            name,
            qualified_name: compact_string(&key),
            kind,
            file_path: compact_string(file_path),
            range,
            accessibility,
            detail,
        });
        Ok(id)
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn signature(&self, id: SymbolId) -> Option<&MethodSignature> {
        self.get(id).and_then(Symbol::signature)
    }

    pub fn by_qualified_name(&self, qualified_name: &str) -> Option<&Symbol> {
        self.by_qualified
            .get(qualified_name)
            .and_then(|&id| self.get(id))
    }

    pub fn find_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Symbol> + use<'a> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.get(id))
    }

    /// Methods declared directly in `type_name` (full name).
    pub fn methods_of<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a Symbol> + use<'a> {
        self.methods_by_type
            .get(type_name)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.get(id))
    }

    /// Resolve a method query to every matching method, in declaration order.
    pub fn resolve_methods(&self, query: &MethodQuery) -> Vec<SymbolId> {
        match query {
            MethodQuery::BySignature(sig) => self
                .by_qualified
                .get(sig.qualified_name().as_str())
                .copied()
                .filter(|&id| self.signature(id) == Some(sig))
                .into_iter()
                .collect(),
            MethodQuery::ByName {
                name,
                containing_type,
            } => self
                .find_by_name(name)
                .filter(|symbol| symbol.is_method())
                .filter(|symbol| match containing_type {
                    Some(ty) => type_name_matches(symbol.owning_type(), ty),
                    None => true,
                })
                .map(|symbol| symbol.id)
                .collect(),
        }
    }

    /// Resolve a usage target: a method key, or `Type.Name` naming the first
    /// declared overload.
    pub fn resolve_method_key(&self, key: &str) -> Option<SymbolId> {
        if let Some(symbol) = self.by_qualified_name(key) {
            return symbol.is_method().then_some(symbol.id);
        }
        if key.contains('(') {
            return None;
        }
        let (owner, name) = key.rsplit_once('.')?;
        self.methods_of(owner)
            .find(|symbol| symbol.name.as_ref() == name)
            .map(|symbol| symbol.id)
    }

    /// Types referred to by simple name, dotted suffix or full name.
    pub fn resolve_types(&self, type_name: &str) -> Vec<SymbolId> {
        if let Some(symbol) = self.by_qualified_name(type_name).filter(|s| s.is_type()) {
            return vec![symbol.id];
        }
        self.find_by_name(simple_name(type_name))
            .filter(|symbol| symbol.is_type())
            .filter(|symbol| type_name_matches(&symbol.qualified_name, type_name))
            .map(|symbol| symbol.id)
            .collect()
    }

    /// Resolve a type by full name, falling back to a unique simple-name match.
    pub fn resolve_type_reference(&self, type_name: &str) -> Option<SymbolId> {
        let candidates = self.resolve_types(type_name);
        if candidates.len() == 1 {
            candidates.first().copied()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_method())
    }

    pub fn types(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_type())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn method_count(&self) -> usize {
        self.methods().count()
    }

    pub fn type_count(&self) -> usize {
        self.types().count()
    }
}
