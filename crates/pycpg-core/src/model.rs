//! Core data structures for the code property graph

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique, stable, content-addressed identifier for a node.
///
/// Produced by [`crate::identity::compute_id`]; never by a counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source location. Lines are 1-based, columns are 0-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// Discriminates what kind of code entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeKind {
    Module,
    Function,
    CodeBlock,
    Variable,
}

impl NodeKind {
    /// Tag used both for serialization and for identity hashing.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::CodeBlock => "code_block",
            NodeKind::Variable => "variable",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in the code property graph.
///
/// The fields shared by every variant live here; the kind-specific payload is
/// the closed, tagged [`NodePayload`] union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub file_path: PathBuf,
    pub span: Span,
    #[serde(flatten)]
    pub payload: NodePayload,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            NodePayload::Module(_) => NodeKind::Module,
            NodePayload::Function(_) => NodeKind::Function,
            NodePayload::CodeBlock(_) => NodeKind::CodeBlock,
            NodePayload::Variable(_) => NodeKind::Variable,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleNode> {
        match &self.payload {
            NodePayload::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionNode> {
        match &self.payload {
            NodePayload::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_code_block(&self) -> Option<&CodeBlockNode> {
        match &self.payload {
            NodePayload::CodeBlock(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableNode> {
        match &self.payload {
            NodePayload::Variable(v) => Some(v),
            _ => None,
        }
    }
}

/// Kind-specific node data, tagged by `kind` when serialized.
///
/// Consumers outside this crate must keep a fallback arm: new kinds may be
/// added without a breaking release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodePayload {
    Module(ModuleNode),
    Function(FunctionNode),
    CodeBlock(CodeBlockNode),
    Variable(VariableNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Dotted module name (`pkg.sub.mod`).
    pub qualified_name: String,
    /// Imported modules and symbols in source order.
    pub imports: Vec<String>,
    /// Public names exposed by the module.
    pub exports: Vec<String>,
    pub is_entrypoint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNode {
    pub qualified_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type_hint: Option<String>,
    pub signature_text: String,
    pub token_count: u32,
    /// Always >= 1.
    pub cyclomatic_complexity: u32,
    pub is_method: bool,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Loop,
    Conditional,
    ExceptionHandler,
    ContextManager,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Loop => "loop",
            BlockKind::Conditional => "conditional",
            BlockKind::ExceptionHandler => "exception_handler",
            BlockKind::ContextManager => "context_manager",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockNode {
    pub block_kind: BlockKind,
    /// Depth within the enclosing function, starting at 1.
    pub nesting_level: u32,
    pub snippet: String,
    /// Back-reference; `None` for blocks at module level.
    pub owning_function_id: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    Module,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNode {
    pub scope: VariableScope,
    pub type_hint: Option<String>,
    pub is_sensitive: bool,
    /// Name conventionally carries untrusted input (`request`, `payload`).
    #[serde(default)]
    pub is_user_input: bool,
    /// Back-reference to the module or function owning the binding.
    pub owning_scope_id: NodeId,
}

/// What kind of relationship this edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Contains,
    Defines,
    Calls,
    Imports,
    References,
    Assigns,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Defines => "DEFINES",
            EdgeKind::Calls => "CALLS",
            EdgeKind::Imports => "IMPORTS",
            EdgeKind::References => "REFERENCES",
            EdgeKind::Assigns => "ASSIGNS",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge in the code property graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Where in source this relationship is expressed.
    pub line: Option<u32>,
    /// Canonical import path for IMPORTS edges.
    pub label: Option<String>,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind, line: Option<u32>) -> Self {
        Edge {
            source,
            target,
            kind,
            line,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
