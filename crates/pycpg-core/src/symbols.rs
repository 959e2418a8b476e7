//! Symbol table for cross-file resolution

use std::collections::HashMap;

use crate::model::NodeId;

/// Maps dotted module names and fully qualified function names to node ids.
///
/// Filled once after per-file builds are collected; lookups are read-only.
#[derive(Debug, Default)]
pub struct SymbolTable {
    modules: HashMap<String, NodeId>,
    functions: HashMap<String, NodeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module(&mut self, qualified_name: impl Into<String>, id: NodeId) {
        self.modules.insert(qualified_name.into(), id);
    }

    pub fn insert_function(&mut self, qualified_name: impl Into<String>, id: NodeId) {
        self.functions.insert(qualified_name.into(), id);
    }

    pub fn module(&self, qualified_name: &str) -> Option<&NodeId> {
        self.modules.get(qualified_name)
    }

    pub fn function(&self, qualified_name: &str) -> Option<&NodeId> {
        self.functions.get(qualified_name)
    }

    /// Resolve a dotted import path to the module it names, trying the full
    /// path first and then each shorter prefix (`pkg.mod.func` → `pkg.mod`).
    pub fn resolve_module(&self, path: &str) -> Option<(&str, &NodeId)> {
        let mut candidate = path;
        loop {
            if let Some((name, id)) = self.modules.get_key_value(candidate) {
                return Some((name.as_str(), id));
            }
            match candidate.rfind('.') {
                Some(pos) => candidate = &candidate[..pos],
                None => return None,
            }
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
