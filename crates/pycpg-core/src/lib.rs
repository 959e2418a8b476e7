//! pycpg core: graph data model, identity scheme, results and symbol table

pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod identity;
pub mod model;
pub mod symbols;

#[cfg(test)]
pub mod tests;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{CpgError, Result};
pub use graph::{CpgGraph, GraphView};
pub use identity::{IdAllocator, compute_id, compute_id_with_occurrence};
pub use model::{
    BlockKind, CodeBlockNode, Edge, EdgeKind, FunctionNode, ModuleNode, Node, NodeId, NodeKind,
    NodePayload, Parameter, Span, VariableNode, VariableScope,
};
pub use symbols::SymbolTable;
