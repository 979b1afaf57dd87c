use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Method,
    Constructor,
    Class,
    Interface,
    Struct,
    Enum,
    Record,
    Delegate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    ProtectedInternal,
    Private,
}

impl SymbolId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    /// Zero-based position in the catalog arena.
    pub(crate) fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl SymbolKind {
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Constructor)
    }

    pub fn is_type(&self) -> bool {
        !self.is_callable()
    }
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }

        if line == self.start_line && column < self.start_column {
            return false;
        }

        if line == self.end_line && column > self.end_column {
            return false;
        }

        true
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

/// Last dotted segment of a qualified name (`Acme.Core.Service` -> `Service`).
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Everything before the last dotted segment, empty for unqualified names.
pub fn namespace_of(qualified: &str) -> &str {
    qualified
        .rfind('.')
        .map(|idx| &qualified[..idx])
        .unwrap_or("")
}

/// Whether `full_name` is referred to by `query` as a full name, a simple
/// name, or a dotted suffix.
pub fn type_name_matches(full_name: &str, query: &str) -> bool {
    if full_name == query {
        return true;
    }
    full_name.len() > query.len()
        && full_name.ends_with(query)
        && full_name.as_bytes()[full_name.len() - query.len() - 1] == b'.'
}

/// Whether `namespace` is `filter` or nested below it.
pub fn namespace_matches(namespace: &str, filter: &str) -> bool {
    namespace == filter
        || (namespace.len() > filter.len()
            && namespace.starts_with(filter)
            && namespace.as_bytes()[filter.len()] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_creation() {
        assert!(SymbolId::new(0).is_none());

        let id = SymbolId::new(42).unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.index(), 41);
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(10, 5, 15, 20);

        assert!(range.contains(12, 10));
        assert!(range.contains(10, 5));
        assert!(range.contains(15, 20));

        assert!(!range.contains(9, 10));
        assert!(!range.contains(16, 10));
        assert!(!range.contains(10, 4));
        assert!(!range.contains(15, 21));
    }

    #[test]
    fn test_symbol_kind_classes() {
        assert!(SymbolKind::Method.is_callable());
        assert!(SymbolKind::Constructor.is_callable());
        assert!(SymbolKind::Interface.is_type());
        assert!(!SymbolKind::Class.is_callable());
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(simple_name("Acme.Core.Service"), "Service");
        assert_eq!(simple_name("Service"), "Service");
        assert_eq!(namespace_of("Acme.Core.Service"), "Acme.Core");
        assert_eq!(namespace_of("Service"), "");
    }

    #[test]
    fn test_type_name_matches() {
        assert!(type_name_matches("Acme.Core.Service", "Service"));
        assert!(type_name_matches("Acme.Core.Service", "Core.Service"));
        assert!(type_name_matches("Acme.Core.Service", "Acme.Core.Service"));
        assert!(!type_name_matches("Acme.Core.MyService", "Service"));
        assert!(!type_name_matches("Service", "Acme.Service"));
    }

    #[test]
    fn test_namespace_matches() {
        assert!(namespace_matches("Acme.Core", "Acme"));
        assert!(namespace_matches("Acme", "Acme"));
        assert!(!namespace_matches("AcmeTools", "Acme"));
        assert!(!namespace_matches("Acme", "Acme.Core"));
    }

    #[test]
    fn test_compact_string() {
        let s = compact_string("hello world");
        assert_eq!(&*s, "hello world");
    }
}
