//! Backend-neutral concrete syntax tree
//!
//! Builders never touch a grammar library directly. A [`SyntaxBackend`]
//! produces an owned [`CstNode`] tree that carries each node's kind, byte and
//! line span, the field label it occupies in its parent, and its children.

use std::time::Duration;

use pycpg_core::Span;
use thiserror::Error;

/// Why a backend could not produce a usable tree for one file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The source contains a syntax error; the whole file is rejected.
    #[error("syntax error at line {line}, column {column}")]
    Structural { line: u32, column: u32 },

    #[error("parse exceeded the {}ms budget", .budget.as_millis())]
    Timeout { budget: Duration },

    /// The tree nests deeper than builders will follow.
    #[error("syntax tree nests deeper than {limit} levels at line {line}")]
    TooDeep { line: u32, limit: usize },

    #[error("parse aborted: {0}")]
    Aborted(String),
}

/// Deepest syntax tree a backend hands to builders. Builders recurse once per
/// level on worker stacks, so anything deeper is rejected at parse time.
pub const MAX_TREE_DEPTH: usize = 1500;

/// Capability every grammar backend provides.
///
/// Backends are selected explicitly through configuration and shared across
/// worker threads, so implementations must not keep per-call state in `self`.
pub trait SyntaxBackend: Send + Sync {
    /// Human-readable backend name, used in logs and error messages.
    fn name(&self) -> &str;

    fn parse(&self, source: &str, timeout: Option<Duration>) -> Result<SyntaxTree, ParseError>;
}

/// Parsed file: the source it was built from plus the root node.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub source: String,
    pub root: CstNode,
}

impl SyntaxTree {
    /// Source text covered by `node`.
    pub fn text(&self, node: &CstNode) -> &str {
        node.text(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstNode {
    pub kind: String,
    /// Field label this node occupies in its parent (`name`, `body`, ...).
    pub field: Option<String>,
    pub is_named: bool,
    /// Set for ERROR nodes and for tokens the backend had to invent.
    pub is_error: bool,
    pub start_byte: usize,
    pub end_byte: usize,
    pub span: Span,
    pub children: Vec<CstNode>,
}

impl CstNode {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start_byte..self.end_byte).unwrap_or("")
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn start_line(&self) -> u32 {
        self.span.start_line
    }

    /// First child carrying the given field label.
    pub fn child_by_field(&self, field: &str) -> Option<&CstNode> {
        self.children
            .iter()
            .find(|c| c.field.as_deref() == Some(field))
    }

    /// Every child carrying the given field label, in source order.
    pub fn children_by_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a CstNode> + 'a {
        self.children
            .iter()
            .filter(move |c| c.field.as_deref() == Some(field))
    }

    pub fn named_children(&self) -> impl Iterator<Item = &CstNode> + '_ {
        self.children.iter().filter(|c| c.is_named)
    }

    pub fn first_child_of_kind(&self, kind: &str) -> Option<&CstNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// First error or missing node in pre-order.
    pub fn first_error(&self) -> Option<&CstNode> {
        self.descendants().find(|n| n.is_error)
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a CstNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a CstNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
