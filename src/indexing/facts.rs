//! Facts reported by a language front end for one source file.
//!
//! A front end resolves source text into declarations and usage sites and
//! writes them as JSON. Nothing here is resolved yet: usage targets are names
//! that the graph builder maps onto catalog symbols.

use crate::symbol::{MethodSignature, TypeShape};
use crate::types::{Accessibility, Range, SymbolKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDeclaration {
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    #[serde(default)]
    pub range: Range,
    #[serde(default)]
    pub accessibility: Accessibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<MethodSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_shape: Option<TypeShape>,
}

impl SymbolDeclaration {
    pub fn method(signature: MethodSignature, file_path: &str, range: Range) -> Self {
        Self {
            qualified_name: signature.display_name(),
            kind: SymbolKind::Method,
            file_path: file_path.to_string(),
            range,
            accessibility: signature.accessibility(),
            signature: Some(signature),
            type_shape: None,
        }
    }

    pub fn type_decl(
        qualified_name: &str,
        kind: SymbolKind,
        shape: TypeShape,
        file_path: &str,
        range: Range,
    ) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            kind,
            file_path: file_path.to_string(),
            range,
            accessibility: Accessibility::Public,
            signature: None,
            type_shape: Some(shape),
        }
    }
}

/// Syntactic position in which a usage site refers to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntacticForm {
    Invocation,
    ObjectCreation,
    ParameterType,
    ReturnType,
    FieldType,
    PropertyType,
    GenericArgument,
}

/// One reference from source code to a method or type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSite {
    /// Method key of the enclosing member, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_symbol: Option<String>,
    /// Method key for invocations, type name otherwise.
    pub target: String,
    pub form: SyntacticForm,
    pub file_path: String,
    pub line: u32,
    #[serde(default)]
    pub column: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Declared type of the receiver expression for member invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_arguments: Vec<String>,
}

impl UsageSite {
    pub fn new(form: SyntacticForm, target: &str, file_path: &str, line: u32, column: u16) -> Self {
        Self {
            from_symbol: None,
            target: target.to_string(),
            form,
            file_path: file_path.to_string(),
            line,
            column,
            snippet: None,
            receiver_type: None,
            generic_arguments: Vec::new(),
        }
    }

    /// An invocation of `target` made from inside `caller`.
    pub fn call(caller: &str, target: &str, file_path: &str, line: u32, column: u16) -> Self {
        Self::new(SyntacticForm::Invocation, target, file_path, line, column).within(caller)
    }

    pub fn within(mut self, symbol: &str) -> Self {
        self.from_symbol = Some(symbol.to_string());
        self
    }

    pub fn with_receiver(mut self, receiver_type: &str) -> Self {
        self.receiver_type = Some(receiver_type.to_string());
        self
    }

    pub fn with_snippet(mut self, snippet: &str) -> Self {
        self.snippet = Some(snippet.to_string());
        self
    }

    pub fn with_generic_arguments(mut self, arguments: &[&str]) -> Self {
        self.generic_arguments = arguments.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// Everything one file contributes to the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFacts {
    pub content_hash: String,
    #[serde(default)]
    pub declarations: Vec<SymbolDeclaration>,
    #[serde(default)]
    pub usages: Vec<UsageSite>,
}

impl FileFacts {
    pub fn new(content_hash: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            declarations: Vec::new(),
            usages: Vec::new(),
        }
    }

    pub fn declare(mut self, declaration: SymbolDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn usage(mut self, usage: UsageSite) -> Self {
        self.usages.push(usage);
        self
    }
}
