//! Cross-file resolution and the final merge

use std::collections::HashSet;

use pycpg_core::{CpgGraph, Diagnostic, Edge, EdgeKind, SymbolTable};

use crate::config::UnresolvedImportPolicy;
use crate::extractor::ExtractionResult;

/// Links per-file results against the project's module and function index.
#[derive(Debug)]
pub struct Resolver {
    symbols: SymbolTable,
    policy: UnresolvedImportPolicy,
}

impl Resolver {
    /// Index every module and function produced by `results`.
    pub fn new(results: &[ExtractionResult], policy: UnresolvedImportPolicy) -> Self {
        let mut symbols = SymbolTable::new();
        for result in results {
            if let Some(module_id) = &result.module_id {
                symbols.insert_module(result.module_name.clone(), module_id.clone());
            }
            for (qualified_name, id) in &result.functions {
                symbols.insert_function(qualified_name.clone(), id.clone());
            }
        }
        tracing::debug!(
            "Symbol table: {} modules, {} functions",
            symbols.module_count(),
            symbols.function_count()
        );
        Resolver { symbols, policy }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Point IMPORTS edges at project modules and append resolved cross-file
    /// calls to `result`'s own edge list.
    pub fn resolve(&self, result: &mut ExtractionResult) {
        let edges = std::mem::take(&mut result.edges);
        let mut kept = Vec::with_capacity(edges.len());
        let mut seen = HashSet::with_capacity(edges.len());

        for mut edge in edges {
            if edge.kind == EdgeKind::Imports {
                let path = edge.label.clone().unwrap_or_default();
                let resolved = self
                    .symbols
                    .resolve_module(&path)
                    .filter(|(_, id)| result.module_id.as_ref() != Some(*id));
                match resolved {
                    Some((module, id)) => {
                        tracing::debug!("Import `{}` in {} resolved to module `{}`", path, result.module_name, module);
                        edge.target = id.clone();
                    }
                    None if self.policy == UnresolvedImportPolicy::Drop => {
                        tracing::debug!("Dropping unresolved import `{}` in {}", path, result.module_name);
                        continue;
                    }
                    None => {
                        tracing::debug!("Import `{}` in {} left as placeholder", path, result.module_name);
                    }
                }
            }
            if seen.insert(edge.clone()) {
                kept.push(edge);
            }
        }

        for call in &result.pending_calls {
            let Some(target) = self.symbols.function(&call.callee) else {
                continue;
            };
            let edge = Edge::new(call.caller.clone(), target.clone(), EdgeKind::Calls, Some(call.line));
            if seen.insert(edge.clone()) {
                kept.push(edge);
            }
        }

        result.edges = kept;
    }
}

/// Resolve each result and merge them in file-path order.
pub fn merge_results(
    mut results: Vec<ExtractionResult>,
    resolver: &Resolver,
    extra: impl IntoIterator<Item = Diagnostic>,
) -> CpgGraph {
    results.sort_by(|a, b| a.file_path.cmp(&b.file_path));

    let mut graph = CpgGraph::new();
    for mut result in results {
        resolver.resolve(&mut result);
        graph.merge(result.into_graph());
    }
    graph.diagnostics.extend(extra);
    graph
}
